//! Test support for the leadhook crates.
//!
//! - [`http::MockReceiver`]: a wiremock-backed webhook destination that
//!   records what it receives and can play status sequences
//! - [`fixtures`]: ready-made lead payloads
//! - [`events::RecordingEventHandler`]: captures lifecycle events for
//!   assertions
//! - scripted and failing transports for engine tests without sockets

pub mod events;
pub mod fixtures;
pub mod http;

pub use events::RecordingEventHandler;
pub use http::{MockReceiver, RecordedRequest};
pub use leadhook_core::TestClock;
pub use leadhook_delivery::transport::mock::{FailingTransport, ScriptedTransport, Step};
