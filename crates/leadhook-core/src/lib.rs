//! Core domain models and delivery events.
//!
//! Provides the lead event payload sent to external webhooks, the outcome
//! type returned by the delivery engine, a clock abstraction for testable
//! timing and the observer trait used to report delivery lifecycle events.
//! The signing and delivery crates build on these types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{CoreError, Result};
pub use events::{
    AttemptFailedEvent, DeadLetterEvent, DeliveryEvent, DeliveryFailedEvent,
    DeliverySucceededEvent, EventHandler, MulticastEventHandler, NoOpEventHandler,
    TracingEventHandler,
};
pub use models::{
    format_timestamp, DeliveryId, DeliveryOutcome, LeadEventType, QualificationTier,
    WebhookPayload, WebhookPayloadBuilder, MAX_QUALIFICATION_SCORE,
};
pub use time::{Clock, RealClock, TestClock};
