use thiserror::Error;

/// Errors surfaced by the parsing and analysis core.
///
/// Parser-internal failures travel as `anyhow::Error` inside the format
/// layer; the registry retries remaining candidates and only converts to
/// one of these typed variants once every option is exhausted. Analysis
/// functions return [`CoreError::InvalidInput`] or
/// [`CoreError::NumericDegenerate`] directly.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No registered parser claimed the file, or every claiming parser
    /// failed on it.
    #[error("unsupported format for '{name}' (attempted: {attempted:?})")]
    UnsupportedFormat {
        /// File name as supplied by the caller.
        name: String,
        /// Formats that claimed the file and were tried, in order.
        attempted: Vec<String>,
    },

    /// A claiming parser failed part-way through the file.
    #[error("corrupt {format} data in '{name}': {source}")]
    CorruptData {
        name: String,
        format: String,
        #[source]
        source: anyhow::Error,
    },

    /// Empty or mismatched-length numeric sequences handed to an
    /// analysis function.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Input that is structurally fine but numerically unusable
    /// (e.g. zero x-variance in a linear fit).
    #[error("numerically degenerate input: {0}")]
    NumericDegenerate(String),
}
