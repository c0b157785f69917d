//! Retry configuration and exponential backoff timing.
//!
//! The delay before attempt `i` (zero-based, `i > 0`) is
//! `initial_delay * backoff_multiplier^(i - 1)`. With the default
//! configuration that gives waits of 1s, 4s and 16s before the three retries.
//! Optional jitter randomizes each wait; it is off unless configured.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DeliveryError, Result};

/// Retry policy for a single delivery call.
///
/// Passed explicitly on every call. The named presets are associated
/// constants and are never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts allowed after the first one.
    pub max_retries: u32,

    /// Wait before the first retry.
    pub initial_delay: Duration,

    /// Factor applied to the wait after each retry. Must be at least 1.
    pub backoff_multiplier: f64,

    /// Budget for each individual attempt.
    pub timeout: Duration,

    /// Randomization (0.0 to 1.0) applied to each wait. Zero disables it.
    pub jitter_factor: f64,
}

impl RetryConfig {
    /// Standard policy: 3 retries, 1s initial wait, x4 growth, 30s per attempt.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_millis(1000),
        backoff_multiplier: 4.0,
        timeout: Duration::from_millis(30_000),
        jitter_factor: 0.0,
    };

    /// Short policy for reachability checks: one retry after 500ms, 5s budget.
    pub const CONNECTIVITY_TEST: Self = Self {
        max_retries: 1,
        initial_delay: Duration::from_millis(500),
        backoff_multiplier: 1.0,
        timeout: Duration::from_millis(5000),
        jitter_factor: 0.0,
    };

    /// Returns the total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Checks that the policy can drive a delivery loop.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` for a multiplier below 1
    /// or not finite, a zero timeout, or a jitter factor outside `0..=1`.
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(DeliveryError::configuration(format!(
                "backoff_multiplier must be a finite value >= 1, got {}",
                self.backoff_multiplier
            )));
        }
        if self.timeout.is_zero() {
            return Err(DeliveryError::configuration("timeout must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(DeliveryError::configuration(format!(
                "jitter_factor must be within 0..=1, got {}",
                self.jitter_factor
            )));
        }
        Ok(())
    }

    /// Deterministic wait before zero-based attempt `attempt_index`.
    ///
    /// Zero for the first attempt. Saturates at `Duration::MAX` instead of
    /// overflowing.
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        if attempt_index == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt_index - 1).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Wait before zero-based attempt `attempt_index`, with jitter applied.
    pub fn delay_before_attempt(&self, attempt_index: u32) -> Duration {
        apply_jitter(self.backoff_delay(attempt_index), self.jitter_factor)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Randomizes the delay by up to +/- `jitter_factor` of its length.
fn apply_jitter(duration: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 || duration.is_zero() || duration == Duration::MAX {
        return duration;
    }

    let clamped_jitter = jitter_factor.clamp(0.0, 1.0);

    let mut rng = rand::rng();
    let jitter_range = duration.as_secs_f64() * clamped_jitter;
    let jitter_offset = rng.random_range(-jitter_range..=jitter_range);
    let jittered_secs = duration.as_secs_f64() + jitter_offset;

    Duration::try_from_secs_f64(jittered_secs.max(0.0)).unwrap_or(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_grows_by_four() {
        let config = RetryConfig::DEFAULT;

        let delays = (0..config.max_attempts())
            .map(|attempt| config.delay_before_attempt(attempt))
            .collect::<Vec<_>>();

        assert_eq!(
            delays,
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(4),
                Duration::from_secs(16),
            ]
        );
    }

    #[test]
    fn connectivity_preset_uses_flat_delay() {
        let config = RetryConfig::CONNECTIVITY_TEST;

        assert_eq!(config.max_attempts(), 2);
        assert_eq!(config.delay_before_attempt(1), Duration::from_millis(500));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn default_trait_matches_named_constant() {
        assert_eq!(RetryConfig::default(), RetryConfig::DEFAULT);
        assert!(RetryConfig::DEFAULT.validate().is_ok());
        assert!(RetryConfig::CONNECTIVITY_TEST.validate().is_ok());
    }

    #[test]
    fn huge_exponents_saturate() {
        let config = RetryConfig { max_retries: u32::MAX, ..RetryConfig::DEFAULT };

        assert_eq!(config.max_attempts(), u32::MAX);
        assert_eq!(config.backoff_delay(10_000), Duration::MAX);
        assert_eq!(config.delay_before_attempt(10_000), Duration::MAX);
    }

    #[test]
    fn invalid_configs_rejected() {
        let below_one = RetryConfig { backoff_multiplier: 0.5, ..RetryConfig::DEFAULT };
        let nan = RetryConfig { backoff_multiplier: f64::NAN, ..RetryConfig::DEFAULT };
        let zero_timeout = RetryConfig { timeout: Duration::ZERO, ..RetryConfig::DEFAULT };
        let big_jitter = RetryConfig { jitter_factor: 1.5, ..RetryConfig::DEFAULT };

        for config in [below_one, nan, zero_timeout, big_jitter] {
            assert!(matches!(
                config.validate(),
                Err(DeliveryError::ConfigurationError { .. })
            ));
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = RetryConfig { jitter_factor: 0.25, ..RetryConfig::DEFAULT };

        for _ in 0..100 {
            let delay = config.delay_before_attempt(2);
            assert!(delay >= Duration::from_secs(3), "{delay:?} below lower bound");
            assert!(delay <= Duration::from_secs(5), "{delay:?} above upper bound");
        }
    }

    #[test]
    fn zero_initial_delay_never_waits() {
        let config = RetryConfig { initial_delay: Duration::ZERO, ..RetryConfig::DEFAULT };
        assert_eq!(config.delay_before_attempt(3), Duration::ZERO);
    }
}
