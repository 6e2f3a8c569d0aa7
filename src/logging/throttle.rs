//! Rate-limited logging utilities.
//!
//! Provides `LogThrottle` to prevent log storms while still tracking suppressed messages.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A lightweight rate limiter for logging to prevent log storms.
#[derive(Debug)]
pub struct LogThrottle {
    last_log_time: Option<Instant>,
    suppressed_count: u64,
    interval: Duration,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_log_time: None,
            suppressed_count: 0,
            interval,
        }
    }

    /// Checks if a log should be emitted.
    /// Returns true if the interval has passed since the last log.
    /// If false, increments the suppressed counter.
    pub fn should_log(&mut self) -> bool {
        let now = Instant::now();
        match self.last_log_time {
            Some(last) if now.duration_since(last) < self.interval => {
                self.suppressed_count += 1;
                false
            }
            _ => {
                self.last_log_time = Some(now);
                true
            }
        }
    }

    /// Returns the number of suppressed logs since the last successful log, and resets the counter.
    pub fn get_and_reset_suppressed_count(&mut self) -> u64 {
        std::mem::take(&mut self.suppressed_count)
    }
}

/// One `LogThrottle` per key (venue name, trail id, ...).
#[derive(Debug)]
pub struct KeyedLogThrottle {
    throttles: HashMap<String, LogThrottle>,
    interval: Duration,
}

impl KeyedLogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            throttles: HashMap::new(),
            interval,
        }
    }

    /// `Some(suppressed)` when a log for `key` should be emitted now.
    pub fn check(&mut self, key: &str) -> Option<u64> {
        let interval = self.interval;
        let throttle = self
            .throttles
            .entry(key.to_string())
            .or_insert_with(|| LogThrottle::new(interval));
        if throttle.should_log() {
            Some(throttle.get_and_reset_suppressed_count())
        } else {
            None
        }
    }
}
