//! Connectivity test for a configured webhook.

use leadhook_core::{DeliveryOutcome, WebhookPayload};
use tracing::info;

use crate::{engine::WebhookDeliverer, error::Result, retry::RetryConfig};

/// Sends a synthetic, signed lead event to check that `url` accepts it.
///
/// Uses [`RetryConfig::CONNECTIVITY_TEST`]: at most two attempts, 500ms
/// apart, 5s each.
///
/// # Errors
///
/// Only for payload encoding failures; an unreachable endpoint is a failed
/// outcome.
pub async fn ping_endpoint(
    deliverer: &WebhookDeliverer,
    url: &str,
    secret: &str,
) -> Result<DeliveryOutcome> {
    let probe = WebhookPayload::connectivity_probe(deliverer.clock().now_utc());
    let outcome =
        deliverer.send_with_retry(url, &probe, secret, &RetryConfig::CONNECTIVITY_TEST).await?;

    info!(
        url = %url,
        success = outcome.success,
        attempts = outcome.attempts,
        status = ?outcome.status_code,
        "connectivity test finished"
    );

    Ok(outcome)
}
