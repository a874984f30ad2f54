//! Retry policy and backoff math.

use rand::Rng;
use std::time::Duration;

/// Retry budget and backoff shape for a single call.
///
/// Immutable once constructed; share one instance (or clones) across
/// callers freely.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for the computed backoff delay, before jitter.
    pub max_delay: Duration,
    /// Multiplier applied per attempt; must be >= 1.
    pub backoff_multiplier: f64,
    /// Fraction of the delay drawn as additive jitter; must be in [0, 1].
    pub jitter_ratio: f64,
    /// Deadline applied to each individual attempt.
    pub per_attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            jitter_ratio: 0.1,
            per_attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Deterministic backoff delay for a zero-indexed attempt:
    /// `min(max_delay, base_delay * backoff_multiplier^attempt)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let raw = self.base_delay.as_secs_f64() * self.backoff_multiplier.powf(f64::from(attempt));
        let capped = if raw.is_finite() {
            raw.min(self.max_delay.as_secs_f64())
        } else {
            self.max_delay.as_secs_f64()
        };
        Duration::from_secs_f64(capped)
    }

    /// Backoff delay plus jitter drawn uniformly from
    /// `[0, jitter_ratio * delay]`. This is what the executor sleeps
    /// between attempts.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        if self.jitter_ratio <= 0.0 {
            return delay;
        }
        let mut rng = rand::rng();
        let jitter = rng.random_range(0.0..=self.jitter_ratio);
        delay + delay.mul_f64(jitter)
    }
}
