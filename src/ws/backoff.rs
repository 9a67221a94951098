//! Exponential reconnect backoff

use std::time::Duration;

/// Doubling delay between reconnect attempts, bounded by a ceiling and reset
/// to the floor after any successful connect.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    /// Backoff starting at `floor`, doubling up to `ceiling`
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Delay to wait before the next attempt; doubles the stored delay
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.ceiling);
        delay
    }

    /// Return to the floor delay after a successful connect
    pub fn reset(&mut self) {
        self.current = self.floor;
    }

    /// Delay the next failure would wait
    pub fn current(&self) -> Duration {
        self.current
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}
