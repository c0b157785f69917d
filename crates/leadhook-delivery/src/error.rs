//! Error types for webhook delivery operations.
//!
//! Every failure an attempt can hit is a [`DeliveryError`]. The engine uses
//! [`DeliveryError::is_retryable`] to decide whether to try again and stores
//! the final error's display text in `DeliveryOutcome::last_error`.

use std::{fmt, time::Duration};

use leadhook_signing::SigningError;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Errors raised while delivering a webhook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Connection could not be established or was dropped.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// Attempt did not complete within its time budget.
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// Budget that was exceeded, in milliseconds
        timeout_ms: u64,
    },

    /// Destination rejected the request (4xx). Never retried.
    #[error("HTTP {status_code}: {reason}")]
    ClientError {
        /// HTTP status code (4xx)
        status_code: u16,
        /// Canonical reason phrase
        reason: String,
        /// Response body content
        body: String,
    },

    /// Destination failed to handle the request (5xx).
    #[error("HTTP {status_code}: {reason}")]
    ServerError {
        /// HTTP status code (5xx)
        status_code: u16,
        /// Canonical reason phrase
        reason: String,
        /// Response body content
        body: String,
    },

    /// Destination answered with a status outside 2xx, 4xx and 5xx.
    #[error("unexpected HTTP status {status_code}")]
    UnexpectedStatus {
        /// HTTP status code
        status_code: u16,
    },

    /// Caller supplied an invalid retry configuration or endpoint.
    #[error("invalid configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },

    /// Payload could not be encoded or signed.
    #[error("serialization failed: {message}")]
    Serialization {
        /// Underlying encoder message
        message: String,
    },

    /// Delivery was cancelled before it finished.
    #[error("delivery cancelled")]
    Cancelled,
}

impl DeliveryError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error for the given budget.
    pub fn timeout(budget: Duration) -> Self {
        Self::Timeout { timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX) }
    }

    /// Creates a client error from an HTTP response.
    pub fn client_error(status_code: u16, body: impl Into<String>) -> Self {
        Self::ClientError { status_code, reason: reason_phrase(status_code), body: body.into() }
    }

    /// Creates a server error from an HTTP response.
    pub fn server_error(status_code: u16, body: impl Into<String>) -> Self {
        Self::ServerError { status_code, reason: reason_phrase(status_code), body: body.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    /// Classifies an HTTP status.
    ///
    /// Returns `None` for 2xx, which is the only success class.
    pub fn from_status(status_code: u16, body: &str) -> Option<Self> {
        match status_code {
            200..=299 => None,
            400..=499 => Some(Self::client_error(status_code, body)),
            500..=599 => Some(Self::server_error(status_code, body)),
            _ => Some(Self::UnexpectedStatus { status_code }),
        }
    }

    /// Determines if this error represents a temporary failure that should be
    /// retried.
    ///
    /// Network errors, timeouts, 5xx responses and unexpected statuses are
    /// retried. 4xx responses, bad configuration and cancellation are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError { .. }
            | Self::Timeout { .. }
            | Self::ServerError { .. }
            | Self::UnexpectedStatus { .. } => true,

            Self::ClientError { .. }
            | Self::ConfigurationError { .. }
            | Self::Serialization { .. }
            | Self::Cancelled => false,
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ClientError { status_code, .. }
            | Self::ServerError { status_code, .. }
            | Self::UnexpectedStatus { status_code } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<SigningError> for DeliveryError {
    fn from(error: SigningError) -> Self {
        Self::serialization(error.to_string())
    }
}

fn reason_phrase(status_code: u16) -> String {
    StatusCode::from_u16(status_code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}

/// Category of delivery error for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connectivity issues and timeouts.
    Network,
    /// HTTP client errors (4xx).
    Client,
    /// HTTP server errors (5xx) and unexpected statuses.
    Server,
    /// Configuration and encoding problems.
    Configuration,
    /// Caller-requested cancellation.
    Cancelled,
}

impl From<&DeliveryError> for ErrorCategory {
    fn from(error: &DeliveryError) -> Self {
        match error {
            DeliveryError::NetworkError { .. } | DeliveryError::Timeout { .. } => Self::Network,
            DeliveryError::ClientError { .. } => Self::Client,
            DeliveryError::ServerError { .. } | DeliveryError::UnexpectedStatus { .. } => {
                Self::Server
            },
            DeliveryError::ConfigurationError { .. } | DeliveryError::Serialization { .. } => {
                Self::Configuration
            },
            DeliveryError::Cancelled => Self::Cancelled,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
            Self::Configuration => write!(f, "configuration"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
