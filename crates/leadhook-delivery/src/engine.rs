//! Retrying webhook deliverer.
//!
//! ```text
//! ┌────────────────┐ canonical ┌───────────┐ per attempt ┌───────────┐
//! │ WebhookPayload │──bytes───▶│ sign once │────────────▶│ Transport │
//! └────────────────┘           └───────────┘             └───────────┘
//!                                                              │
//!                        2xx ◀── classify ◀────────────────────┘
//!                        4xx ──▶ stop
//!                        5xx / network / timeout ──▶ back off, retry
//! ```
//!
//! Attempts within one call run strictly in sequence. The body and
//! signature are computed once and reused by every attempt; only the
//! timestamp header changes.

use std::sync::Arc;

use bytes::Bytes;
use leadhook_core::{
    format_timestamp, AttemptFailedEvent, Clock, DeliveryEvent, DeliveryFailedEvent, DeliveryId,
    DeliveryOutcome, DeliverySucceededEvent, EventHandler, NoOpEventHandler, RealClock,
    WebhookPayload,
};
use leadhook_signing::{canonical_bytes, sign_bytes};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::{
    client::{ClientConfig, DeliveryClient, DeliveryRequest},
    error::{DeliveryError, ErrorCategory, Result},
    retry::RetryConfig,
    transport::Transport,
};

/// Delivers signed lead events with bounded retry.
///
/// Cheap to clone and safe to share across tasks. Each call to
/// [`send_with_retry`](Self::send_with_retry) is independent.
#[derive(Debug, Clone)]
pub struct WebhookDeliverer {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    event_handler: Arc<dyn EventHandler>,
}

impl WebhookDeliverer {
    /// Creates a deliverer backed by a reqwest client.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the HTTP client cannot
    /// be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(DeliveryClient::new(config)?)))
    }

    /// Creates a deliverer with the default HTTP client.
    ///
    /// # Errors
    ///
    /// See [`WebhookDeliverer::new`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Creates a deliverer over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            clock: Arc::new(RealClock::new()),
            event_handler: Arc::new(NoOpEventHandler::new()),
        }
    }

    /// Replaces the clock used for backoff sleeps and timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the handler that receives lifecycle events.
    #[must_use]
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = handler;
        self
    }

    /// Returns the clock in use.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Delivers `payload` to `url`, retrying transient failures.
    ///
    /// Delivery failures never surface as `Err`: they are reported in the
    /// returned outcome.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError` if `config` fails [`RetryConfig::validate`]
    /// - `Serialization` if the payload cannot be encoded
    pub async fn send_with_retry(
        &self,
        url: &str,
        payload: &WebhookPayload,
        secret: &str,
        config: &RetryConfig,
    ) -> Result<DeliveryOutcome> {
        self.deliver(DeliveryId::new(), url, payload, secret, config, &CancellationToken::new())
            .await
    }

    /// Like [`send_with_retry`](Self::send_with_retry), but stops early when
    /// `cancel` fires.
    ///
    /// A cancelled call aborts the in-flight attempt, skips any remaining
    /// retries and returns a failed outcome with `last_error` set to
    /// `"delivery cancelled"`. `attempts` counts attempts started, and is
    /// at least 1.
    ///
    /// # Errors
    ///
    /// Same as [`send_with_retry`](Self::send_with_retry).
    pub async fn send_with_retry_cancellable(
        &self,
        url: &str,
        payload: &WebhookPayload,
        secret: &str,
        config: &RetryConfig,
        cancel: &CancellationToken,
    ) -> Result<DeliveryOutcome> {
        self.deliver(DeliveryId::new(), url, payload, secret, config, cancel).await
    }

    pub(crate) async fn deliver(
        &self,
        delivery_id: DeliveryId,
        url: &str,
        payload: &WebhookPayload,
        secret: &str,
        config: &RetryConfig,
        cancel: &CancellationToken,
    ) -> Result<DeliveryOutcome> {
        config.validate()?;

        let body = canonical_bytes(payload)?;
        let signature = sign_bytes(&body, secret)?;

        let span = info_span!(
            "send_with_retry",
            delivery_id = %delivery_id,
            url = %url,
            lead_id = %payload.lead_id,
            event_type = %payload.event_type
        );

        let attempt_loop =
            AttemptLoop { deliverer: self, delivery_id, url, payload, config, cancel };
        Ok(attempt_loop.run(body, signature).instrument(span).await)
    }
}

struct AttemptLoop<'a> {
    deliverer: &'a WebhookDeliverer,
    delivery_id: DeliveryId,
    url: &'a str,
    payload: &'a WebhookPayload,
    config: &'a RetryConfig,
    cancel: &'a CancellationToken,
}

impl AttemptLoop<'_> {
    async fn run(&self, body: Bytes, signature: String) -> DeliveryOutcome {
        let clock = &self.deliverer.clock;
        let mut last_error: Option<DeliveryError> = None;
        let mut last_status: Option<u16> = None;
        let mut attempts = 0;

        for attempt_index in 0..self.config.max_attempts() {
            if attempt_index > 0 {
                let delay = self.config.delay_before_attempt(attempt_index);
                debug!(
                    delay_ms = delay.as_millis(),
                    next_attempt = attempt_index + 1,
                    "backing off"
                );

                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => {
                        return self.cancelled(attempts, last_status).await;
                    },
                    () = clock.sleep(delay) => {},
                }
            }

            if self.cancel.is_cancelled() {
                return self.cancelled(attempts, last_status).await;
            }

            attempts = attempt_index + 1;
            let request = DeliveryRequest {
                delivery_id: self.delivery_id,
                url: self.url.to_string(),
                body: body.clone(),
                signature: signature.clone(),
                timestamp: format_timestamp(clock.now_utc()),
                attempt_number: attempts,
                timeout: self.config.timeout,
            };

            let exchange = tokio::time::timeout(
                self.config.timeout,
                self.deliverer.transport.post(&request),
            );
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return self.cancelled(attempts, last_status).await;
                },
                result = exchange => result,
            };

            let error = match result {
                Ok(Ok(response)) => {
                    match DeliveryError::from_status(response.status_code, &response.body) {
                        None => {
                            let status = response.status_code;
                            return self.succeeded(attempts, status, response.body).await;
                        },
                        Some(error) => error,
                    }
                },
                Ok(Err(error)) => error,
                Err(_elapsed) => DeliveryError::timeout(self.config.timeout),
            };

            if let Some(status) = error.status_code() {
                last_status = Some(status);
            }
            let retryable = error.is_retryable();

            warn!(
                attempt = attempts,
                max_attempts = self.config.max_attempts(),
                category = %ErrorCategory::from(&error),
                retryable,
                error = %error,
                "webhook attempt failed"
            );
            self.emit(DeliveryEvent::AttemptFailed(AttemptFailedEvent {
                delivery_id: self.delivery_id,
                url: self.url.to_string(),
                lead_id: self.payload.lead_id.clone(),
                attempt_number: attempts,
                status_code: error.status_code(),
                error_message: error.to_string(),
                is_retryable: retryable,
                failed_at: clock.now_utc(),
            }))
            .await;

            last_error = Some(error);
            if !retryable {
                break;
            }
        }

        let last_error =
            last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string());
        self.failed(attempts.max(1), last_error, last_status).await
    }

    async fn succeeded(&self, attempts: u32, status_code: u16, body: String) -> DeliveryOutcome {
        debug!(attempts, status = status_code, "webhook accepted");

        self.emit(DeliveryEvent::Succeeded(DeliverySucceededEvent {
            delivery_id: self.delivery_id,
            url: self.url.to_string(),
            event_type: self.payload.event_type,
            lead_id: self.payload.lead_id.clone(),
            status_code,
            attempts,
            delivered_at: self.deliverer.clock.now_utc(),
        }))
        .await;

        DeliveryOutcome::delivered(body, attempts, status_code)
    }

    async fn failed(
        &self,
        attempts: u32,
        last_error: String,
        status: Option<u16>,
    ) -> DeliveryOutcome {
        self.emit(DeliveryEvent::Failed(DeliveryFailedEvent {
            delivery_id: self.delivery_id,
            url: self.url.to_string(),
            lead_id: self.payload.lead_id.clone(),
            attempts,
            last_error: last_error.clone(),
            failed_at: self.deliverer.clock.now_utc(),
        }))
        .await;

        DeliveryOutcome::failed(attempts, last_error, status)
    }

    async fn cancelled(&self, attempts: u32, status: Option<u16>) -> DeliveryOutcome {
        debug!(attempts, "webhook delivery cancelled");
        self.failed(attempts.max(1), DeliveryError::Cancelled.to_string(), status).await
    }

    async fn emit(&self, event: DeliveryEvent) {
        self.deliverer.event_handler.handle_event(event).await;
    }
}
