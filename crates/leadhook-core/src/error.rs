//! Error types for payload construction and validation.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building or validating domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A required field was missing or empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field carried a value outside its allowed range.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_format() {
        assert_eq!(CoreError::MissingField("lead_id").to_string(), "missing field: lead_id");
        assert_eq!(
            CoreError::InvalidInput("score 120 exceeds 100".to_string()).to_string(),
            "invalid input: score 120 exceeds 100"
        );
    }
}
