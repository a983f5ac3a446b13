//! # Backoff Calculator
//!
//! Retry delay policy for failed work items: capped exponential growth
//! with optional jitter so a burst of simultaneous failures against a
//! rate-limited agent does not retry in lockstep.

use std::time::Duration;

use crate::config::BatchCoreConfig;

/// Jitter fraction applied on top of the exponential delay
const JITTER_FACTOR: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl BackoffCalculator {
    pub fn new(base_delay: Duration, max_delay: Duration, multiplier: f64, jitter: bool) -> Self {
        Self {
            base_delay,
            max_delay,
            multiplier,
            jitter,
        }
    }

    pub fn from_config(config: &BatchCoreConfig) -> Self {
        Self::new(
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
            config.backoff_multiplier,
            config.backoff_jitter,
        )
    }

    /// Delay before the given attempt, 1-based: attempt 1 waits the base
    /// delay, each further attempt multiplies it, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .base_delay
            .mul_f64(self.multiplier.powi(attempt.saturating_sub(1) as i32));
        let delay = delay.min(self.max_delay);

        if self.jitter {
            let jitter = fastrand::f64() * JITTER_FACTOR;
            delay.mul_f64(1.0 + jitter).min(self.max_delay)
        } else {
            delay
        }
    }
}

impl Default for BackoffCalculator {
    fn default() -> Self {
        Self::from_config(&BatchCoreConfig::default())
    }
}
