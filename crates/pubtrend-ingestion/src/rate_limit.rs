//! Shared request-rate limiter.
//!
//! One limiter gates every call the process makes to the E-utilities
//! service, regardless of how many manufacturers or terms are being fetched
//! in parallel: the service's ceiling is global, so the limiter is too.
//! Admission is FIFO: `tokio::sync::Mutex` queues waiters fairly, so a
//! burst of concurrent fetches drains in arrival order without starvation.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between consecutive requests.
    min_interval: Duration,
    /// Time of the most recent admitted request. `None` until the first one,
    /// which is admitted immediately.
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// A limiter admitting at most `requests_per_second` requests. Zero or
    /// negative disables limiting.
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the next request slot is free, then claims it.
    ///
    /// The lock is held across the sleep on purpose: it is what serializes
    /// admission and keeps the queue FIFO.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "rate limit delay");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
