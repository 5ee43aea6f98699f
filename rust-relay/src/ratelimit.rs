//! Rolling-window rate limiter for outbound Events API calls.
//!
//! The limiter remembers when each of the last `max_calls` calls started.
//! A new call may start once the oldest of those has aged out of the window,
//! so no trailing window ever contains more than `max_calls` starts.
//!
//! It is owned by the single dispatcher and takes `&mut self`; a second
//! consumer would need to share it behind a lock.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Sliding-window limiter: at most `max_calls` starts per `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_calls` per `window`.
    ///
    /// A zero `max_calls` is treated as one.
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            calls: VecDeque::new(),
        }
    }

    /// Wait until another call fits in the window, then record it.
    ///
    /// Never fails; backpressure is expressed purely as delay.
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            self.evict_expired(now);

            if self.calls.len() < self.max_calls {
                self.calls.push_back(now);
                return;
            }

            // Full window: the oldest start frees the next slot.
            let Some(&oldest) = self.calls.front() else {
                continue;
            };
            let ready_at = oldest + self.window;
            debug!(
                wait_ms = ready_at.saturating_duration_since(now).as_millis() as u64,
                calls_in_window = self.calls.len(),
                "rate_limit_wait"
            );
            sleep_until(ready_at).await;
        }
    }

    /// Configured maximum calls per window.
    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some(&started) = self.calls.front() {
            if now.duration_since(started) >= self.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
impl RateLimiter {
    /// Create a limiter allowing `max_calls` per minute.
    pub(crate) fn per_minute(max_calls: usize) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }

    /// Number of calls started within the current window.
    pub(crate) fn calls_in_window(&self) -> usize {
        let now = Instant::now();
        self.calls
            .iter()
            .filter(|&&started| now.duration_since(started) < self.window)
            .count()
    }
}
