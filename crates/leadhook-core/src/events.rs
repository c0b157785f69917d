//! Delivery lifecycle events and the observer trait that receives them.
//!
//! The delivery engine never surfaces failures by panicking or by returning
//! an error for a failed delivery. Instead it reports what happened through
//! an [`EventHandler`]. Callers that run deliveries in the background rely
//! on [`DeliveryEvent::DeadLettered`] to learn about events that could not
//! be delivered.
//!
//! ```text
//! ┌──────────────────┐  AttemptFailed   ┌───────────────────────┐
//! │ WebhookDeliverer │ ───────────────▶ │ EventHandler          │
//! │ Dispatcher       │  Succeeded       │  ● TracingEventHandler│
//! └──────────────────┘  Failed          │  ● DeadLetterChannel  │
//!                       DeadLettered    │  ● Multicast          │
//!                                       └───────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::models::{DeliveryId, DeliveryOutcome, LeadEventType, WebhookPayload};

/// Events emitted by the delivery subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeliveryEvent {
    /// A single attempt failed; more attempts may follow.
    AttemptFailed(AttemptFailedEvent),

    /// The destination accepted the event.
    Succeeded(DeliverySucceededEvent),

    /// The delivery call finished without success.
    Failed(DeliveryFailedEvent),

    /// A background delivery failed and was set aside for reprocessing.
    DeadLettered(DeadLetterEvent),
}

impl DeliveryEvent {
    /// Returns the delivery this event belongs to.
    pub fn delivery_id(&self) -> DeliveryId {
        match self {
            Self::AttemptFailed(e) => e.delivery_id,
            Self::Succeeded(e) => e.delivery_id,
            Self::Failed(e) => e.delivery_id,
            Self::DeadLettered(e) => e.delivery_id,
        }
    }
}

/// Emitted after every failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailedEvent {
    /// Delivery the attempt belongs to.
    pub delivery_id: DeliveryId,
    /// Destination URL.
    pub url: String,
    /// Lead being announced.
    pub lead_id: String,
    /// Attempt number (1-based).
    pub attempt_number: u32,
    /// HTTP status if the destination answered.
    pub status_code: Option<u16>,
    /// Why the attempt failed.
    pub error_message: String,
    /// Whether another attempt is allowed for this failure class.
    pub is_retryable: bool,
    /// When the attempt failed.
    pub failed_at: DateTime<Utc>,
}

/// Emitted once when a delivery succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySucceededEvent {
    /// Delivery that succeeded.
    pub delivery_id: DeliveryId,
    /// Destination URL.
    pub url: String,
    /// Kind of lead event delivered.
    pub event_type: LeadEventType,
    /// Lead being announced.
    pub lead_id: String,
    /// HTTP status returned by the destination.
    pub status_code: u16,
    /// Attempts it took (1-based).
    pub attempts: u32,
    /// When the delivery completed.
    pub delivered_at: DateTime<Utc>,
}

/// Emitted once when a delivery call gives up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailedEvent {
    /// Delivery that failed.
    pub delivery_id: DeliveryId,
    /// Destination URL.
    pub url: String,
    /// Lead being announced.
    pub lead_id: String,
    /// Attempts made.
    pub attempts: u32,
    /// Last recorded failure.
    pub last_error: String,
    /// When the call gave up.
    pub failed_at: DateTime<Utc>,
}

/// A background delivery that exhausted its options.
///
/// Carries the full payload so an operator can replay it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterEvent {
    /// Delivery that failed.
    pub delivery_id: DeliveryId,
    /// Destination URL.
    pub url: String,
    /// The event that could not be delivered.
    pub payload: WebhookPayload,
    /// Final outcome of the delivery call.
    pub outcome: DeliveryOutcome,
    /// When the failure was set aside.
    pub dead_lettered_at: DateTime<Utc>,
}

/// Trait for handling delivery events.
///
/// Implementations must not block delivery processing. Handler failures are
/// the handler's own concern and are never propagated back to the engine.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync + std::fmt::Debug {
    /// Handles a delivery event.
    async fn handle_event(&self, event: DeliveryEvent);
}

/// Event handler that discards all events.
#[derive(Debug, Default)]
pub struct NoOpEventHandler;

impl NoOpEventHandler {
    /// Creates a new no-op event handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl EventHandler for NoOpEventHandler {
    async fn handle_event(&self, _event: DeliveryEvent) {}
}

/// Event handler that writes every event to the `tracing` log.
///
/// Dead letters are logged at `error` level so they surface in any sink
/// that collects errors.
#[derive(Debug, Default)]
pub struct TracingEventHandler;

impl TracingEventHandler {
    /// Creates a new tracing event handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl EventHandler for TracingEventHandler {
    async fn handle_event(&self, event: DeliveryEvent) {
        match event {
            DeliveryEvent::AttemptFailed(e) => {
                debug!(
                    delivery_id = %e.delivery_id,
                    url = %e.url,
                    attempt = e.attempt_number,
                    status = ?e.status_code,
                    retryable = e.is_retryable,
                    error = %e.error_message,
                    "webhook attempt failed"
                );
            },
            DeliveryEvent::Succeeded(e) => {
                info!(
                    delivery_id = %e.delivery_id,
                    url = %e.url,
                    lead_id = %e.lead_id,
                    attempts = e.attempts,
                    status = e.status_code,
                    "webhook delivered"
                );
            },
            DeliveryEvent::Failed(e) => {
                warn!(
                    delivery_id = %e.delivery_id,
                    url = %e.url,
                    lead_id = %e.lead_id,
                    attempts = e.attempts,
                    error = %e.last_error,
                    "webhook delivery failed"
                );
            },
            DeliveryEvent::DeadLettered(e) => {
                error!(
                    delivery_id = %e.delivery_id,
                    url = %e.url,
                    lead_id = %e.payload.lead_id,
                    event_type = %e.payload.event_type,
                    attempts = e.outcome.attempts,
                    error = e.outcome.last_error.as_deref().unwrap_or("unknown"),
                    "webhook dead-lettered"
                );
            },
        }
    }
}

/// Event handler that forwards events to multiple subscribers.
///
/// Events are delivered to all subscribers concurrently.
#[derive(Debug, Clone, Default)]
pub struct MulticastEventHandler {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl MulticastEventHandler {
    /// Creates a new multicast handler with no subscribers.
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Adds a subscriber to receive delivery events.
    pub fn add_subscriber(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

#[async_trait::async_trait]
impl EventHandler for MulticastEventHandler {
    async fn handle_event(&self, event: DeliveryEvent) {
        let futures = self.handlers.iter().map(|handler| {
            let event = event.clone();
            async move {
                handler.handle_event(event).await;
            }
        });

        futures::future::join_all(futures).await;
    }
}
