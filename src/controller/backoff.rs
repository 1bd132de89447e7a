//! # Fibonacci Backoff
//!
//! Requeue delays for resources whose reconcile failed. The sequence grows more slowly
//! than exponential back-off: 1m, 1m, 2m, 3m, 5m, 8m, 10m, 10m, ...
//!
//! ```rust
//! use edge_provider_controller::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(1, 10);
//! assert_eq!(backoff.next_backoff().as_secs(), 60);
//! assert_eq!(backoff.next_backoff().as_secs(), 60);
//! assert_eq!(backoff.next_backoff().as_secs(), 120);
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator, in whole minutes
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// `min_minutes` seeds the sequence, `max_minutes` caps it
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Return the current delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let delay = Duration::from_secs(self.current_minutes * 60);
        let next = self.prev_minutes.saturating_add(self.current_minutes);
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next.min(self.max_minutes);
        delay
    }

    /// Start again from the minimum
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}
