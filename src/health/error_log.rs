//! Rate limiting for poll-failure logs.

use std::time::{Duration, Instant};

/// Caps poll-failure warnings to one per window, however often the poller ticks.
#[derive(Debug, Clone)]
pub struct ErrorRateLimiter {
    window: Duration,
    last_error: Option<Instant>,
}

impl ErrorRateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_error: None,
        }
    }

    /// Record a failure at `now`. Returns true if it should be logged.
    pub fn should_log(&mut self, now: Instant) -> bool {
        let emit = match self.last_error {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.window,
        };
        if emit {
            self.last_error = Some(now);
        }
        emit
    }

    /// Clear the failure streak. Returns true if a streak was in progress.
    pub fn recover(&mut self) -> bool {
        self.last_error.take().is_some()
    }

    pub fn last_error(&self) -> Option<Instant> {
        self.last_error
    }
}
