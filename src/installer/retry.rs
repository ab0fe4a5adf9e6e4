// src/installer/retry.rs

//! Retry policy with exponential backoff

use std::time::Duration;

/// Longest single backoff wait unless overridden
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5 * 60);

/// How often and how patiently a package install is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total install attempts, including the first (>= 1)
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each further failure
    pub backoff: u32,
    /// Upper bound on any single wait
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; zero attempts or backoff are raised to one
    pub fn new(max_attempts: u32, base_delay: Duration, backoff: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff: backoff.max(1),
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Cap every wait at `max_delay`
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// A single attempt, never retried
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    ///
    /// `base_delay * backoff^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay = match self.backoff.checked_pow(exponent) {
            Some(factor) => self.base_delay.saturating_mul(factor),
            None => Duration::MAX,
        };
        delay.min(self.max_delay)
    }

    /// Whether another attempt follows failed attempt number `attempt`
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2), 2)
    }
}
