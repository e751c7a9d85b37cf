use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FileInput – what a parser receives
// ---------------------------------------------------------------------------

/// An instrument export handed to the parser layer: raw bytes plus the
/// original file name (used for extension-based dispatch).
#[derive(Debug, Clone)]
pub struct FileInput {
    /// Original file name, e.g. `"cv_scan_03.mpt"`.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// File size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lower-cased extension without the dot, or `""` when absent.
    pub fn extension(&self) -> String {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Contents as text. Vendor exports are occasionally Latin-1, so
    /// invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

// ---------------------------------------------------------------------------
// Technique – experiment classification
// ---------------------------------------------------------------------------

/// Classification of the electrochemical experiment an export contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Technique {
    /// Cyclic voltammetry (potential sweep vs. current).
    CyclicVoltammetry,
    /// Electrochemical impedance spectroscopy.
    Impedance,
    /// Battery cycling (charge/discharge, capacity per cycle).
    Battery,
    /// Tafel / corrosion analysis.
    Tafel,
    /// Chronoamperometry (current vs. time at fixed potential).
    Chronoamperometry,
    /// Nothing recognised; the data is still usable as a plain table.
    Other,
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Technique::CyclicVoltammetry => "Cyclic Voltammetry",
            Technique::Impedance => "Impedance Spectroscopy",
            Technique::Battery => "Battery Cycling",
            Technique::Tafel => "Tafel",
            Technique::Chronoamperometry => "Chronoamperometry",
            Technique::Other => "Other",
        };
        write!(f, "{label}")
    }
}

// ---------------------------------------------------------------------------
// DataTable – the numeric payload
// ---------------------------------------------------------------------------

/// The tabular payload of a parsed export.
///
/// Invariant: every row has exactly `columns.len()` values; parsers drop
/// rows that would violate this rather than constructing a ragged table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    /// Ordered column names, unique within one table.
    pub columns: Vec<String>,
    /// Numeric rows in acquisition order.
    pub rows: Vec<Vec<f64>>,
}

impl DataTable {
    /// Index of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Extract one column as an owned vector, for handing to the
    /// analysis layer.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ParsedData – the uniform parser output
// ---------------------------------------------------------------------------

/// Uniform output of every format parser.
///
/// Immutable once constructed: parsers build it, hand it back by value,
/// and this crate never stores or mutates it afterwards. Re-parsing the
/// same file yields a fresh, independent instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedData {
    /// Detected experiment technique.
    pub technique: Technique,
    /// Free-text vendor / source label, e.g. `"BioLogic EC-Lab"`.
    pub instrument: String,
    /// Instrument-declared header and settings fields, in file order.
    /// Semantics are instrument-specific; this crate does not interpret
    /// them further.
    pub metadata: Vec<(String, String)>,
    /// The numeric table.
    pub data: DataTable,
    /// Column name → physical unit, where derivable from the name.
    pub units: BTreeMap<String, String>,
}

impl ParsedData {
    /// Look up a metadata value by key (first occurrence).
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_and_optional() {
        let f = FileInput::new("Scan_01.MPT", b"x".to_vec());
        assert_eq!(f.extension(), "mpt");
        assert_eq!(f.size(), 1);

        let bare = FileInput::new("README", Vec::new());
        assert_eq!(bare.extension(), "");
    }

    #[test]
    fn column_extraction() {
        let table = DataTable {
            columns: vec!["time/s".into(), "Ewe/V".into()],
            rows: vec![vec![0.0, 1.5], vec![0.1, 1.6]],
        };
        assert_eq!(table.column("Ewe/V"), Some(vec![1.5, 1.6]));
        assert_eq!(table.column("missing"), None);
        assert_eq!(table.len(), 2);
    }
}
