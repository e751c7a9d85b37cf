use anyhow::{bail, Result};

use super::model::{DataTable, FileInput, ParsedData};
use super::registry::{parse_numeric_token, split_columns, FormatParser};
use super::technique::{detect_technique, units_for_columns};

/// Parser for Gamry Framework exports (`.dta`).
///
/// The format is tag-oriented text: `TAG<TAB>TYPE<TAB>VALUE[<TAB>LABEL]`
/// lines describe the experiment, and each `CURVE ... TABLE` marker
/// introduces a tab-delimited table whose first row names the columns
/// and whose second row carries their units.
pub struct GamryParser;

impl FormatParser for GamryParser {
    fn format_name(&self) -> &'static str {
        "Gamry .dta"
    }

    fn can_parse(&self, file: &FileInput) -> bool {
        file.extension() == "dta" || file.bytes.starts_with(b"EXPLAIN")
    }

    fn parse(&self, file: &FileInput) -> Result<ParsedData> {
        let text = file.text();
        let lines: Vec<&str> = text.lines().collect();

        // Tag lines up to the first curve table become metadata.
        let table_start = lines
            .iter()
            .position(|l| is_table_marker(l))
            .unwrap_or(lines.len());

        let mut metadata = Vec::new();
        for line in &lines[..table_start] {
            if let Some((key, value)) = split_tag_line(line) {
                metadata.push((key, value));
            }
        }

        if table_start >= lines.len() {
            bail!("no CURVE table found");
        }

        // Column header row, then the units row.
        let mut rest = lines[table_start + 1..]
            .iter()
            .skip_while(|l| l.trim().is_empty());
        let columns = match rest.next() {
            Some(header) => split_columns(header),
            None => bail!("CURVE table has no column row"),
        };
        if columns.is_empty() {
            bail!("CURVE table column row is empty");
        }

        let mut units = units_for_columns(&columns);
        let mut rows = Vec::new();
        let mut saw_units_row = false;

        for line in rest {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            // A second curve table ends the data region; only the first
            // table is surfaced.
            if is_table_marker(line) {
                break;
            }
            let tokens = split_columns(line);

            // The row right under the header names units ("s", "V vs. Ref.",
            // "A", ...); map it onto the columns positionally.
            if !saw_units_row && !is_numeric_row(&tokens) {
                saw_units_row = true;
                for (col, unit) in columns.iter().zip(tokens.iter()) {
                    units
                        .entry(col.clone())
                        .or_insert_with(|| unit.clone());
                }
                continue;
            }
            saw_units_row = true;

            if tokens.len() != columns.len() {
                continue;
            }
            rows.push(tokens.iter().map(|t| parse_numeric_token(t)).collect());
        }

        let technique = detect_technique(&columns, &text);
        Ok(ParsedData {
            technique,
            instrument: "Gamry Framework".to_string(),
            metadata,
            data: DataTable { columns, rows },
            units,
        })
    }
}

/// `CURVE<TAB>TABLE<TAB>...` (also `OCVCURVE`, `CURVE1`, ...).
fn is_table_marker(line: &str) -> bool {
    let mut parts = line.split('\t');
    let tag = parts.next().unwrap_or("").trim();
    let kind = parts.next().unwrap_or("").trim();
    tag.contains("CURVE") && kind == "TABLE"
}

/// Split a tag line into key/value metadata: the VALUE field when
/// present, otherwise the TYPE field.
fn split_tag_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.split('\t').map(str::trim);
    let tag = parts.next()?;
    if tag.is_empty() {
        return None;
    }
    let type_field = parts.next().unwrap_or("");
    let value = parts.next().filter(|v| !v.is_empty()).unwrap_or(type_field);
    if value.is_empty() {
        return None;
    }
    Some((tag.to_string(), value.to_string()))
}

/// Whether every token parses as a number directly (no substitution).
fn is_numeric_row(tokens: &[String]) -> bool {
    !tokens.is_empty() && tokens.iter().all(|t| t.parse::<f64>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Technique;

    fn sample_dta() -> String {
        let mut s = String::new();
        s.push_str("EXPLAIN\n");
        s.push_str("TAG\tCV\n");
        s.push_str("TITLE\tLABEL\tCyclic Voltammetry\tTest identifier\n");
        s.push_str("SCANRATE\tQUANT\t0.1\tScan Rate (V/s)\n");
        s.push_str("CURVE\tTABLE\t3\n");
        s.push_str("Pt\tT\tVf\tIm\n");
        s.push_str("#\ts\tV vs. Ref.\tA\n");
        s.push_str("0\t0.0\t-0.5\t-1.2e-5\n");
        s.push_str("1\t0.1\t-0.45\t-8.0e-6\n");
        s.push_str("2\t0.2\t-0.4\tbad\n");
        s
    }

    #[test]
    fn parses_tags_units_and_rows() {
        let file = FileInput::new("cv.dta", sample_dta().into_bytes());
        let parser = GamryParser;
        assert!(parser.can_parse(&file));

        let parsed = parser.parse(&file).unwrap();
        assert_eq!(parsed.data.columns, vec!["Pt", "T", "Vf", "Im"]);
        assert_eq!(parsed.data.len(), 3);
        // Unparseable token zero-substituted.
        assert_eq!(parsed.data.rows[2][3], 0.0);

        assert_eq!(parsed.metadata_value("TITLE"), Some("Cyclic Voltammetry"));
        assert_eq!(parsed.metadata_value("SCANRATE"), Some("0.1"));

        // Units row mapped positionally, bare-name inference fills the rest.
        assert_eq!(parsed.units.get("T").map(String::as_str), Some("s"));
        assert_eq!(parsed.units.get("Im").map(String::as_str), Some("A"));

        assert_eq!(parsed.technique, Technique::CyclicVoltammetry);
        assert_eq!(parsed.instrument, "Gamry Framework");
    }

    #[test]
    fn file_without_table_is_rejected() {
        let file = FileInput::new("meta.dta", b"EXPLAIN\nTAG\tCV\n".to_vec());
        assert!(GamryParser.parse(&file).is_err());
    }
}
