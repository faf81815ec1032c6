//! Retry policy for timed-out requests

use crate::transport::TransportError;
use std::time::Duration;

/// Linear backoff: retry `n` waits `n * base_delay`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of resends after the first attempt
    pub max_retries: usize,
    /// Delay unit multiplied by the retry number
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_delay,
        }
    }

    /// Never resend
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Whether retry number `retry` (1-based) may be sent after `error`
    pub fn should_retry(&self, retry: usize, error: &TransportError) -> bool {
        retry <= self.max_retries && error.is_timeout()
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff_duration(&self, retry: usize) -> Duration {
        self.base_delay
            .saturating_mul(u32::try_from(retry).unwrap_or(u32::MAX))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}
