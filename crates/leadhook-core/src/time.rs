//! Time source for backoff sleeps and request timestamps.
//!
//! The delivery engine sleeps between attempts and stamps each request with
//! its send time. Both go through [`Clock`], so tests can run a whole retry
//! schedule instantly and then assert on the exact delays requested.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::BoxFuture;

/// Source of wall-clock time and delays.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Waits for `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// System time and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a real clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Virtual clock for deterministic tests.
///
/// `sleep` returns after a single yield, moving virtual time forward by the
/// requested amount and recording it. Clones share state, so a clock handed
/// to the engine can be inspected from the test afterwards.
#[derive(Debug, Clone)]
pub struct TestClock {
    start: DateTime<Utc>,
    state: Arc<Mutex<VirtualTime>>,
}

#[derive(Debug, Default)]
struct VirtualTime {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl TestClock {
    /// Creates a clock starting at the current wall-clock time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Creates a clock starting at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { start, state: Arc::new(Mutex::new(VirtualTime::default())) }
    }

    /// Moves virtual time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state();
        state.elapsed = state.elapsed.saturating_add(duration);
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.state().elapsed
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn recorded_sleeps(&self) -> Vec<Duration> {
        self.state().sleeps.clone()
    }

    fn state(&self) -> MutexGuard<'_, VirtualTime> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now_utc(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.elapsed()).unwrap_or(TimeDelta::MAX);
        self.start.checked_add_signed(elapsed).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        {
            let mut state = self.state();
            state.sleeps.push(duration);
            state.elapsed = state.elapsed.saturating_add(duration);
        }
        Box::pin(tokio::task::yield_now())
    }
}
