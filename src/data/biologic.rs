use anyhow::{bail, Result};

use super::model::{DataTable, FileInput, ParsedData, Technique};
use super::registry::{parse_numeric_token, split_columns, FormatParser};
use super::technique::{detect_technique, units_for_columns};

const INSTRUMENT: &str = "BioLogic EC-Lab";

/// The line that declares how many header lines the export carries,
/// e.g. `Nb header lines : 55`.
const HEADER_COUNT_KEY: &str = "Nb header lines";

// ---------------------------------------------------------------------------
// EC-Lab ASCII export (.mpt)
// ---------------------------------------------------------------------------

/// Parser for BioLogic EC-Lab ASCII exports (`.mpt`).
///
/// The file is one text blob with three regions: a header whose length
/// is declared by the `Nb header lines` line, a tab-separated settings
/// region, and a tab-delimited data table introduced by a column row.
pub struct BiologicTextParser;

impl FormatParser for BiologicTextParser {
    fn format_name(&self) -> &'static str {
        "BioLogic .mpt"
    }

    fn can_parse(&self, file: &FileInput) -> bool {
        file.extension() == "mpt" || file.bytes.starts_with(b"EC-Lab ASCII FILE")
    }

    fn parse(&self, file: &FileInput) -> Result<ParsedData> {
        let text = file.text();
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            bail!("empty file");
        }

        // (a) Declared header-line count slices the header region.
        let header_end = declared_header_count(&lines).unwrap_or(0).min(lines.len());

        // (b) Scan forward from the header end for the first line that
        // looks like the column row; without one, the data region
        // starts immediately after the header.
        let data_start = (header_end..lines.len())
            .find(|&i| is_column_signature(lines[i]))
            .unwrap_or(header_end);

        // Header fields plus (c) the settings region between header end
        // and data start, as tab-separated key/value pairs. The count
        // declaration line itself is skipped.
        let mut metadata = Vec::new();
        for line in &lines[..data_start] {
            if line.trim().is_empty() || line.starts_with(HEADER_COUNT_KEY) {
                continue;
            }
            if let Some((key, value)) = split_key_value(line) {
                metadata.push((key, value));
            }
        }

        // (d) First non-empty data line is the column header row.
        let mut data_lines = lines[data_start.min(lines.len())..]
            .iter()
            .skip_while(|l| l.trim().is_empty());
        let columns = match data_lines.next() {
            Some(header) => split_columns(header),
            None => bail!("no data region found"),
        };
        if columns.is_empty() {
            bail!("empty column header row");
        }

        // Numeric rows: malformed tokens become 0.0, rows with the
        // wrong arity are dropped.
        let mut rows = Vec::new();
        for line in data_lines {
            if line.trim().is_empty() {
                continue;
            }
            let tokens = split_columns(line);
            if tokens.len() != columns.len() {
                continue;
            }
            rows.push(tokens.iter().map(|t| parse_numeric_token(t)).collect());
        }

        let technique = detect_technique(&columns, &text);
        let units = units_for_columns(&columns);
        Ok(ParsedData {
            technique,
            instrument: INSTRUMENT.to_string(),
            metadata,
            data: DataTable { columns, rows },
            units,
        })
    }
}

/// Extract the declared header-line count, if the declaration exists.
fn declared_header_count(lines: &[&str]) -> Option<usize> {
    lines.iter().find_map(|line| {
        let line = line.trim();
        line.strip_prefix(HEADER_COUNT_KEY)
            .and_then(|rest| rest.trim_start_matches([':', ' ', '\t']).trim().parse().ok())
    })
}

/// Whether a line is the data-region column row: starts with `mode`, or
/// names a potential, frequency, or (case-insensitively) time column.
fn is_column_signature(line: &str) -> bool {
    let tokens = split_columns(line);
    if tokens.first().map(String::as_str) == Some("mode") {
        return true;
    }
    tokens.iter().any(|t| {
        t == "Ewe/V"
            || t == "<Ewe>/V"
            || t == "Ecell/V"
            || t == "freq/Hz"
            || t.to_ascii_lowercase().contains("time")
    })
}

/// Split a header/settings line into a key/value pair: tab-separated
/// first, falling back to the `key : value` form EC-Lab also emits.
fn split_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line
        .split_once('\t')
        .or_else(|| line.split_once(" : "))
        .or_else(|| line.split_once(':'))?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

// ---------------------------------------------------------------------------
// EC-Lab binary export (.mpr) – deliberate placeholder
// ---------------------------------------------------------------------------

/// Placeholder parser for BioLogic binary exports (`.mpr`).
///
/// The binary layout is not decoded. A stub table is returned with a
/// metadata comment instructing the caller to re-export the experiment
/// as `.mpt` text from EC-Lab. This is a documented simplification, not
/// a gap to fill in.
pub struct BiologicBinaryParser;

impl FormatParser for BiologicBinaryParser {
    fn format_name(&self) -> &'static str {
        "BioLogic .mpr"
    }

    fn can_parse(&self, file: &FileInput) -> bool {
        file.extension() == "mpr" || file.bytes.starts_with(b"BIO-LOGIC MODULES FILE")
    }

    fn parse(&self, file: &FileInput) -> Result<ParsedData> {
        let columns: Vec<String> = ["time/s", "Ewe/V", "<I>/mA"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let units = units_for_columns(&columns);
        Ok(ParsedData {
            technique: Technique::Other,
            instrument: INSTRUMENT.to_string(),
            metadata: vec![
                ("source".to_string(), file.name.clone()),
                (
                    "comment".to_string(),
                    "Binary .mpr export is not decoded; re-export as .mpt ASCII text from EC-Lab"
                        .to_string(),
                ),
            ],
            data: DataTable {
                columns,
                rows: Vec::new(),
            },
            units,
        })
    }
}
