//! Transport abstraction for the delivery engine.
//!
//! The engine talks to destinations only through [`Transport`], so retry
//! and classification logic can be exercised without sockets. Production
//! uses [`DeliveryClient`](crate::client::DeliveryClient).

use std::{future::Future, pin::Pin};

use crate::{
    client::{DeliveryRequest, DeliveryResponse},
    error::Result,
};

/// Boxed future returned by [`Transport::post`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<DeliveryResponse>> + Send + 'a>>;

/// Sends one signed request to a destination.
///
/// Implementations return `Ok` for any HTTP response, whatever the status,
/// and `Err` only when no response was obtained.
pub trait Transport: Send + Sync + std::fmt::Debug + 'static {
    /// POSTs the request body with its signature headers.
    fn post<'a>(&'a self, request: &'a DeliveryRequest) -> TransportFuture<'a>;
}

pub mod mock {
    //! In-memory transports for testing delivery logic.
    //!
    //! [`ScriptedTransport`] plays back a fixed list of steps and records
    //! every request it receives. [`FailingTransport`] fails every call.

    use std::{collections::VecDeque, sync::Arc, time::Duration};

    use tokio::sync::Mutex;

    use super::{Transport, TransportFuture};
    use crate::{
        client::{DeliveryRequest, DeliveryResponse},
        error::DeliveryError,
    };

    /// One scripted reaction to a request.
    #[derive(Debug, Clone)]
    pub enum Step {
        /// Answer with the given status and body.
        Respond(u16, String),
        /// Fail without a response.
        Fail(DeliveryError),
        /// Never complete. Exercises attempt timeouts and cancellation.
        Hang,
    }

    impl Step {
        /// Answer with `status` and an empty body.
        pub fn status(status: u16) -> Self {
            Self::Respond(status, String::new())
        }
    }

    /// Transport that replays scripted steps in order.
    ///
    /// Once the script runs out the last step repeats. An empty script
    /// answers 200.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedTransport {
        steps: Arc<Mutex<VecDeque<Step>>>,
        last: Arc<Mutex<Option<Step>>>,
        requests: Arc<Mutex<Vec<DeliveryRequest>>>,
    }

    impl ScriptedTransport {
        /// Creates a transport that plays `steps` in order.
        pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                steps: Arc::new(Mutex::new(steps.into_iter().collect())),
                last: Arc::new(Mutex::new(None)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Creates a transport that answers every request with `status`.
        pub fn always(status: u16) -> Self {
            Self::new([Step::status(status)])
        }

        /// Returns every request received so far.
        pub async fn requests(&self) -> Vec<DeliveryRequest> {
            self.requests.lock().await.clone()
        }

        /// Returns the number of requests received so far.
        pub async fn request_count(&self) -> usize {
            self.requests.lock().await.len()
        }

        async fn next_step(&self) -> Step {
            let mut last = self.last.lock().await;
            if let Some(step) = self.steps.lock().await.pop_front() {
                *last = Some(step.clone());
                return step;
            }
            last.clone().unwrap_or_else(|| Step::status(200))
        }
    }

    impl Transport for ScriptedTransport {
        fn post<'a>(&'a self, request: &'a DeliveryRequest) -> TransportFuture<'a> {
            Box::pin(async move {
                self.requests.lock().await.push(request.clone());

                match self.next_step().await {
                    Step::Respond(status_code, body) => {
                        Ok(DeliveryResponse { status_code, body, duration: Duration::ZERO })
                    },
                    Step::Fail(error) => Err(error),
                    Step::Hang => std::future::pending().await,
                }
            })
        }
    }

    /// Transport whose every call fails with a network error.
    #[derive(Debug, Clone, Default)]
    pub struct FailingTransport {
        calls: Arc<Mutex<u32>>,
    }

    impl FailingTransport {
        /// Creates a failing transport.
        pub fn new() -> Self {
            Self::default()
        }

        /// Returns how many times `post` was called.
        pub async fn calls(&self) -> u32 {
            *self.calls.lock().await
        }
    }

    impl Transport for FailingTransport {
        fn post<'a>(&'a self, _request: &'a DeliveryRequest) -> TransportFuture<'a> {
            Box::pin(async move {
                *self.calls.lock().await += 1;
                Err(DeliveryError::network("connection refused"))
            })
        }
    }
}
