//! Error types for payload signing.

use thiserror::Error;

/// Result type alias using `SigningError`.
pub type Result<T> = std::result::Result<T, SigningError>;

/// Errors that prevent a signature from being produced.
///
/// A signature that does not match is not an error; verification returns
/// `false` instead.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Payload could not be encoded as JSON.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Secret was rejected by the MAC implementation.
    #[error("invalid signing key")]
    InvalidKey,
}
