use thiserror::Error;

/// Result type for tool parser operations
pub type ParserResult<T> = Result<T, ParserError>;

/// Errors that can occur while extracting tool calls
///
/// None of these escape the public extraction entry points; they are logged
/// and turned into a narration-only result.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Parsing failed: {0}")]
    ParsingFailed(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Sentinel fragments {fragments:?} do not spell {sentinel}")]
    FragmentMismatch {
        sentinel: String,
        fragments: Vec<String>,
    },
}
