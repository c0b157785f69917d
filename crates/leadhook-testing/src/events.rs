//! Event handler that records lifecycle events for assertions.

use std::sync::Arc;

use leadhook_core::{
    AttemptFailedEvent, DeadLetterEvent, DeliveryEvent, DeliveryFailedEvent,
    DeliverySucceededEvent, EventHandler,
};
use tokio::sync::Mutex;

/// Captures every event it receives, in order.
///
/// Clones share the same log, so keep one clone in the test and hand the
/// other to the deliverer or dispatcher.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventHandler {
    events: Arc<Mutex<Vec<DeliveryEvent>>>,
}

impl RecordingEventHandler {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far.
    pub async fn events(&self) -> Vec<DeliveryEvent> {
        self.events.lock().await.clone()
    }

    /// Number of events received so far.
    pub async fn count(&self) -> usize {
        self.events.lock().await.len()
    }

    /// Per-attempt failures.
    pub async fn attempt_failures(&self) -> Vec<AttemptFailedEvent> {
        self.filter(|e| match e {
            DeliveryEvent::AttemptFailed(inner) => Some(inner.clone()),
            _ => None,
        })
        .await
    }

    /// Successful deliveries.
    pub async fn successes(&self) -> Vec<DeliverySucceededEvent> {
        self.filter(|e| match e {
            DeliveryEvent::Succeeded(inner) => Some(inner.clone()),
            _ => None,
        })
        .await
    }

    /// Deliveries that gave up.
    pub async fn failures(&self) -> Vec<DeliveryFailedEvent> {
        self.filter(|e| match e {
            DeliveryEvent::Failed(inner) => Some(inner.clone()),
            _ => None,
        })
        .await
    }

    /// Dead-lettered background deliveries.
    pub async fn dead_letters(&self) -> Vec<DeadLetterEvent> {
        self.filter(|e| match e {
            DeliveryEvent::DeadLettered(inner) => Some(inner.clone()),
            _ => None,
        })
        .await
    }

    async fn filter<T>(&self, select: impl Fn(&DeliveryEvent) -> Option<T>) -> Vec<T> {
        self.events.lock().await.iter().filter_map(select).collect()
    }
}

#[async_trait::async_trait]
impl EventHandler for RecordingEventHandler {
    async fn handle_event(&self, event: DeliveryEvent) {
        self.events.lock().await.push(event);
    }
}
