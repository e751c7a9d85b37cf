use anyhow::{bail, Context, Result};

use super::model::{DataTable, FileInput, ParsedData};
use super::registry::{parse_numeric_token, FormatParser};
use super::technique::{detect_technique, units_for_columns};

/// Universal fallback: any file treated as delimited text, first row
/// headers, every following row numeric data.
///
/// Claims every file, so it must be registered last — vendor formats
/// get first refusal through the registry ordering.
pub struct GenericTextParser;

impl FormatParser for GenericTextParser {
    fn format_name(&self) -> &'static str {
        "generic delimited text"
    }

    fn can_parse(&self, _file: &FileInput) -> bool {
        true
    }

    fn parse(&self, file: &FileInput) -> Result<ParsedData> {
        let text = file.text();

        let header_line = text
            .lines()
            .find(|l| !l.trim().is_empty())
            .context("file is empty")?;
        let delimiter = sniff_delimiter(header_line);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .context("reading header row")?
            .iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        if columns.is_empty() {
            bail!("no column headers found");
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                // One bad record should not abort the whole table.
                Err(_) => continue,
            };
            let tokens: Vec<&str> = record.iter().map(str::trim).filter(|t| !t.is_empty()).collect();
            if tokens.len() != columns.len() {
                continue;
            }
            rows.push(tokens.iter().map(|t| parse_numeric_token(t)).collect());
        }

        if rows.is_empty() {
            bail!("no numeric data rows under the header");
        }

        let technique = detect_technique(&columns, &text);
        let units = units_for_columns(&columns);
        Ok(ParsedData {
            technique,
            instrument: "Generic delimited text".to_string(),
            metadata: vec![("source".to_string(), file.name.clone())],
            data: DataTable { columns, rows },
            units,
        })
    }
}

/// Pick the delimiter by counting candidates in the header line: tab,
/// then semicolon, then comma as the default.
fn sniff_delimiter(header: &str) -> u8 {
    let tabs = header.matches('\t').count();
    let semis = header.matches(';').count();
    let commas = header.matches(',').count();
    if tabs >= semis && tabs >= commas && tabs > 0 {
        b'\t'
    } else if semis > commas {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_separated_round_trip() {
        let text = "time,potential,current\n0.0,0.1,1e-3\n1.0,0.2,2e-3\n";
        let file = FileInput::new("export.csv", text.as_bytes().to_vec());
        let parsed = GenericTextParser.parse(&file).unwrap();

        assert_eq!(parsed.data.columns, vec!["time", "potential", "current"]);
        assert_eq!(
            parsed.data.rows,
            vec![vec![0.0, 0.1, 1e-3], vec![1.0, 0.2, 2e-3]]
        );
        assert_eq!(parsed.units.get("time").map(String::as_str), Some("s"));
    }

    #[test]
    fn semicolon_and_bad_tokens() {
        let text = "a;b\n1;x\n3;4\n";
        let file = FileInput::new("data.txt", text.as_bytes().to_vec());
        let parsed = GenericTextParser.parse(&file).unwrap();
        assert_eq!(parsed.data.rows, vec![vec![1.0, 0.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn header_only_file_fails() {
        let file = FileInput::new("empty.csv", b"a,b,c\n".to_vec());
        assert!(GenericTextParser.parse(&file).is_err());
    }
}
