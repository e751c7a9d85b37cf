use anyhow::Result;
use log::{debug, warn};

use super::biologic::{BiologicBinaryParser, BiologicTextParser};
use super::gamry::GamryParser;
use super::generic::GenericTextParser;
use super::model::{FileInput, ParsedData};
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// FormatParser – the capability pair every format implements
// ---------------------------------------------------------------------------

/// One instrument file format.
///
/// `can_parse` must stay cheap (extension and content sniffing only);
/// `parse` may fail, in which case the registry moves on to the next
/// claiming parser rather than surfacing the failure immediately.
pub trait FormatParser: Send + Sync {
    /// Short format label used in logs and error messages.
    fn format_name(&self) -> &'static str;

    /// Whether this parser claims the file.
    fn can_parse(&self, file: &FileInput) -> bool;

    /// Parse the file into the uniform table.
    fn parse(&self, file: &FileInput) -> Result<ParsedData>;
}

// ---------------------------------------------------------------------------
// ParserRegistry – ordered dispatch
// ---------------------------------------------------------------------------

/// Ordered set of format parsers: most specific first, the generic
/// delimited-text fallback last so vendor formats get first refusal.
///
/// Built once and passed by reference; holds no mutable state, so one
/// registry serves any number of threads.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn FormatParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self {
            parsers: vec![
                Box::new(BiologicTextParser),
                Box::new(BiologicBinaryParser),
                Box::new(GamryParser),
                // Catch-all; must stay last.
                Box::new(GenericTextParser),
            ],
        }
    }
}

impl ParserRegistry {
    /// Dispatch a file to the first parser that both claims and
    /// successfully parses it.
    ///
    /// A claiming parser's failure is logged and the next claiming
    /// parser is tried; only total exhaustion (no claims, or every
    /// claim failed) surfaces as [`CoreError::UnsupportedFormat`].
    pub fn parse_file(&self, file: &FileInput) -> Result<ParsedData, CoreError> {
        let mut attempted = Vec::new();

        for parser in &self.parsers {
            if !parser.can_parse(file) {
                debug!(
                    "{}: not claimed by {}",
                    file.name,
                    parser.format_name()
                );
                continue;
            }
            attempted.push(parser.format_name().to_string());

            match parser.parse(file) {
                Ok(parsed) => {
                    debug!(
                        "{}: parsed as {} ({} rows, {} columns)",
                        file.name,
                        parser.format_name(),
                        parsed.data.len(),
                        parsed.data.columns.len()
                    );
                    return Ok(parsed);
                }
                Err(err) => {
                    warn!(
                        "{}: {} parser failed, trying next candidate: {err:#}",
                        file.name,
                        parser.format_name()
                    );
                }
            }
        }

        Err(CoreError::UnsupportedFormat {
            name: file.name.clone(),
            attempted,
        })
    }

    /// Parse with one specific format, bypassing dispatch.
    ///
    /// Unlike [`ParserRegistry::parse_file`] there is no fallback: a
    /// parser failure surfaces directly as [`CoreError::CorruptData`].
    pub fn parse_as(&self, format: &str, file: &FileInput) -> Result<ParsedData, CoreError> {
        let parser = self
            .parsers
            .iter()
            .find(|p| p.format_name() == format)
            .ok_or_else(|| CoreError::UnsupportedFormat {
                name: file.name.clone(),
                attempted: vec![format.to_string()],
            })?;

        parser.parse(file).map_err(|source| CoreError::CorruptData {
            name: file.name.clone(),
            format: format.to_string(),
            source,
        })
    }

    /// Format labels in dispatch order, for diagnostics.
    pub fn format_names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.format_name()).collect()
    }
}

// ---------------------------------------------------------------------------
// Shared token helpers used by the text parsers
// ---------------------------------------------------------------------------

/// Parse one numeric token, substituting `0.0` on failure.
///
/// Preserved legacy behavior: a malformed token never costs the whole
/// row. Vendor exports localise decimal commas, so those are retried.
pub(crate) fn parse_numeric_token(token: &str) -> f64 {
    let token = token.trim();
    token
        .parse::<f64>()
        .or_else(|_| token.replace(',', ".").parse::<f64>())
        .unwrap_or(0.0)
}

/// Tab-split a line into trimmed, non-empty tokens.
pub(crate) fn split_columns(line: &str) -> Vec<String> {
    line.split('\t')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
