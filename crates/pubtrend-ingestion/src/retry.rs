//! Retry with exponential backoff for transient service failures.
//!
//! Rate-limit responses (429) and server errors (5xx) retry; other client
//! errors do not. Jitter spreads simultaneous retries so parallel term
//! fetches don't hammer the service in lockstep.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(16);
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// May succeed on retry: timeouts, connection drops, 5xx.
    Transient,
    /// HTTP 429; retried with backoff like transient failures.
    RateLimited,
    /// Retrying would not help: 4xx, malformed request.
    Permanent,
}

impl FailureKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => FailureKind::RateLimited,
            408 => FailureKind::Transient,
            s if (500..600).contains(&s) => FailureKind::Transient,
            _ => FailureKind::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::Permanent)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether the given (1-indexed) failed attempt gets another try.
    pub fn should_retry(&self, kind: FailureKind, attempt: u32) -> bool {
        kind.is_retryable() && attempt < self.max_attempts
    }

    /// `min(base * 2^(attempt-1), max) + jitter`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "backoff before retry");
        delay + Duration::from_millis(jitter_ms)
    }
}
