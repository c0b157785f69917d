//! Validation of webhook destinations before they are stored or used.

use reqwest::Url;

use crate::error::{DeliveryError, Result};

/// Checks that `url` is an absolute http(s) URL with a host and that a
/// signing secret is present.
///
/// # Errors
///
/// Returns `DeliveryError::ConfigurationError` describing the first problem.
pub fn validate_endpoint(url: &str, secret: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| DeliveryError::configuration(format!("invalid webhook URL '{url}': {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DeliveryError::configuration(format!(
            "webhook URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => {},
        _ => return Err(DeliveryError::configuration("webhook URL has no host")),
    }

    if secret.is_empty() {
        return Err(DeliveryError::configuration("webhook secret must not be empty"));
    }

    Ok(parsed)
}
