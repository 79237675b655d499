//! Retry policy and backoff schedule.

use std::time::Duration;

use crate::config::RetryConfig;

/// Upper bound on a single backoff delay. Exponential growth on a large
/// base interval overflows `f64` to infinity, which `Duration` rejects.
const MAX_DELAY_SECS: f64 = 300.0;

/// Retry policy attached to every compiled route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub retries: u32,

    /// Base interval in seconds.
    pub interval: f64,

    /// `interval^attempt` backoff when set, else a constant interval.
    pub exponential: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            retries: config.retries,
            // Negative intervals make no sense; clamp rather than fail.
            interval: config.interval.max(0.0),
            exponential: config.exponential,
        }
    }

    /// Total number of downstream calls this policy permits.
    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Delay before attempt `n` (1-based; attempt 1 has no delay).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let retry_number = attempt - 1;
        let secs = if self.exponential {
            self.interval.powi(retry_number as i32)
        } else {
            self.interval
        };
        Duration::from_secs_f64(secs.min(MAX_DELAY_SECS))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
