//! Fire-and-forget delivery with dead-letter routing.
//!
//! [`Dispatcher::dispatch`] returns as soon as the delivery task is spawned.
//! A delivery that ends without success is never dropped silently: it is
//! logged at `error` level and handed to the dispatcher's [`EventHandler`]
//! as [`DeliveryEvent::DeadLettered`].

use std::sync::Arc;

use leadhook_core::{
    DeadLetterEvent, DeliveryEvent, DeliveryId, DeliveryOutcome, EventHandler, TracingEventHandler,
    WebhookPayload,
};
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};

use crate::{engine::WebhookDeliverer, retry::RetryConfig};

/// Spawns deliveries in the background and tracks them until shutdown.
#[derive(Debug)]
pub struct Dispatcher {
    deliverer: WebhookDeliverer,
    dead_letters: Arc<dyn EventHandler>,
    tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl Dispatcher {
    /// Creates a dispatcher whose failures are only logged.
    pub fn new(deliverer: WebhookDeliverer) -> Self {
        Self::with_dead_letter_handler(deliverer, Arc::new(TracingEventHandler::new()))
    }

    /// Creates a dispatcher that routes failed deliveries to `handler`.
    pub fn with_dead_letter_handler(
        deliverer: WebhookDeliverer,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            deliverer,
            dead_letters: handler,
            tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Starts a delivery and returns without waiting for it.
    ///
    /// Must be called from within a Tokio runtime. The returned id matches
    /// the `delivery_id` on any event the delivery produces. After
    /// [`shutdown`](Self::shutdown) nothing is sent: the delivery is
    /// dead-lettered as cancelled.
    pub fn dispatch(
        &self,
        url: impl Into<String>,
        payload: WebhookPayload,
        secret: impl Into<String>,
        config: RetryConfig,
    ) -> DeliveryId {
        let delivery_id = DeliveryId::new();
        let url = url.into();
        let secret = secret.into();
        let deliverer = self.deliverer.clone();
        let dead_letters = self.dead_letters.clone();
        let cancel = self.cancellation_token.child_token();

        if self.tracker.is_closed() {
            warn!(delivery_id = %delivery_id, url = %url, "dispatcher is shut down, not sending");
            cancel.cancel();
        }

        self.tracker.spawn(async move {
            let outcome = match deliverer
                .deliver(delivery_id, &url, &payload, &secret, &config, &cancel)
                .await
            {
                Ok(outcome) if outcome.success => return,
                Ok(outcome) => outcome,
                Err(e) => DeliveryOutcome::failed(1, e.to_string(), None),
            };

            error!(
                delivery_id = %delivery_id,
                url = %url,
                lead_id = %payload.lead_id,
                attempts = outcome.attempts,
                error = outcome.last_error.as_deref().unwrap_or("unknown"),
                "background webhook delivery failed"
            );

            dead_letters
                .handle_event(DeliveryEvent::DeadLettered(DeadLetterEvent {
                    delivery_id,
                    url,
                    payload,
                    outcome,
                    dead_lettered_at: deliverer.clock().now_utc(),
                }))
                .await;
        });

        delivery_id
    }

    /// Number of deliveries still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Closes the dispatcher and waits for in-flight deliveries to finish.
    ///
    /// Later dispatches are cancelled before their first attempt.
    pub async fn shutdown(&self) {
        info!(in_flight = self.tracker.len(), "waiting for background deliveries");
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Cancels in-flight deliveries and waits for them to wind down.
    ///
    /// Cancelled deliveries are dead-lettered like any other failure.
    pub async fn shutdown_now(&self) {
        warn!(in_flight = self.tracker.len(), "cancelling background deliveries");
        self.cancellation_token.cancel();
        self.shutdown().await;
    }
}

/// Handler that forwards dead letters into a channel for reprocessing.
///
/// Other events are ignored.
#[derive(Debug, Clone)]
pub struct DeadLetterChannel {
    sender: mpsc::UnboundedSender<DeadLetterEvent>,
}

impl DeadLetterChannel {
    /// Creates the handler together with the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeadLetterEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait::async_trait]
impl EventHandler for DeadLetterChannel {
    async fn handle_event(&self, event: DeliveryEvent) {
        if let DeliveryEvent::DeadLettered(dead_letter) = event {
            let delivery_id = dead_letter.delivery_id;
            if self.sender.send(dead_letter).is_err() {
                warn!(delivery_id = %delivery_id, "dead letter receiver dropped");
            }
        }
    }
}
