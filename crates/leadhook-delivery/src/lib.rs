//! Signed webhook delivery with bounded exponential backoff.
//!
//! Posts lead events to client-configured URLs. Each call signs the
//! canonical payload once, then runs up to `max_retries + 1` attempts:
//!
//! 1. **Sign** - HMAC-SHA256 over the canonical JSON body
//! 2. **Send** - POST with signature and timestamp headers, bounded by the
//!    per-attempt timeout
//! 3. **Classify** - 2xx succeeds, 4xx stops, anything else is retried
//! 4. **Back off** - `initial_delay * multiplier^(retry - 1)` between attempts
//!
//! Failures are reported in the returned [`DeliveryOutcome`], never raised.
//! [`Dispatcher`] runs deliveries in the background and dead-letters those
//! that fail.
//!
//! # Example
//!
//! ```no_run
//! use leadhook_core::{LeadEventType, QualificationTier, WebhookPayload};
//! use leadhook_delivery::{RetryConfig, WebhookDeliverer};
//!
//! # async fn example() -> leadhook_delivery::Result<()> {
//! let deliverer = WebhookDeliverer::with_defaults()?;
//! let payload = WebhookPayload::builder(LeadEventType::LeadQualified, "lead_123")
//!     .qualification(QualificationTier::Hot, 85)
//!     .occurred_at(chrono::Utc::now())
//!     .build()
//!     .expect("valid payload");
//!
//! let outcome = deliverer
//!     .send_with_retry("https://crm.example.com/hooks", &payload, "secret", &RetryConfig::DEFAULT)
//!     .await?;
//! println!("delivered: {} after {} attempts", outcome.success, outcome.attempts);
//! # Ok(())
//! # }
//! ```
//!
//! [`DeliveryOutcome`]: leadhook_core::DeliveryOutcome

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod dispatch;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod probe;
pub mod retry;
pub mod transport;

pub use client::{
    ClientConfig, DeliveryClient, DeliveryRequest, DeliveryResponse, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
pub use dispatch::{DeadLetterChannel, Dispatcher};
pub use endpoint::validate_endpoint;
pub use engine::WebhookDeliverer;
pub use error::{DeliveryError, ErrorCategory, Result};
pub use probe::ping_endpoint;
pub use retry::RetryConfig;
pub use transport::Transport;
