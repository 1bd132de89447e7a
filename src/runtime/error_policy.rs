//! # Error Policy
//!
//! Requeue delays for failed reconciles. Each resource keeps its own Fibonacci back-off,
//! reset when a reconcile of that resource succeeds. A failing resource is retried at least
//! every `ERROR_BACKOFF_MAX_MINUTES`, so an entry that has not failed for twice that long
//! belongs to a resource that is gone and is dropped.

use crate::constants::{ERROR_BACKOFF_MAX_MINUTES, ERROR_BACKOFF_MIN_MINUTES};
use crate::controller::backoff::FibonacciBackoff;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use std::time::Duration;
use tokio::time::Instant;

const STALE_AFTER: Duration = Duration::from_secs(ERROR_BACKOFF_MAX_MINUTES * 60 * 2);

#[derive(Debug)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
    last_failure: Instant,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(ERROR_BACKOFF_MIN_MINUTES, ERROR_BACKOFF_MAX_MINUTES),
            error_count: 0,
            last_failure: Instant::now(),
        }
    }
}

/// Per-resource error back-off for one kind
#[derive(Debug, Default)]
pub struct ErrorBackoff {
    states: Mutex<HashMap<String, BackoffState>>,
}

impl ErrorBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay before the next attempt at `name`, and how many failures in a row it has had
    pub fn next_delay(&self, name: &str) -> (Duration, u32) {
        let Ok(mut states) = self.states.lock() else {
            return (Duration::from_secs(ERROR_BACKOFF_MIN_MINUTES * 60), 1);
        };
        let before = states.len();
        states.retain(|_, state| state.last_failure.elapsed() <= STALE_AFTER);
        if states.len() < before {
            debug!(dropped = before - states.len(), "dropped stale back-off entries");
        }

        let state = states
            .entry(name.to_string())
            .or_insert_with(BackoffState::new);
        state.error_count = state.error_count.saturating_add(1);
        state.last_failure = Instant::now();
        (state.backoff.next_backoff(), state.error_count)
    }

    /// Forget the failures of `name`; returns whether it was backing off
    pub fn reset(&self, name: &str) -> bool {
        self.states
            .lock()
            .ok()
            .and_then(|mut states| states.remove(name))
            .is_some_and(|state| state.error_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_grow_per_resource() {
        let backoff = ErrorBackoff::new();
        assert_eq!(backoff.next_delay("a"), (Duration::from_secs(60), 1));
        assert_eq!(backoff.next_delay("a"), (Duration::from_secs(60), 2));
        assert_eq!(backoff.next_delay("a"), (Duration::from_secs(120), 3));
        assert_eq!(backoff.next_delay("b"), (Duration::from_secs(60), 1));
    }

    #[test]
    fn test_reset_starts_over() {
        let backoff = ErrorBackoff::new();
        backoff.next_delay("a");
        backoff.next_delay("a");
        assert!(backoff.reset("a"));
        assert!(!backoff.reset("a"));
        assert_eq!(backoff.next_delay("a"), (Duration::from_secs(60), 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_of_vanished_resources_are_dropped() {
        let backoff = ErrorBackoff::new();
        backoff.next_delay("deleted-while-failing");
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        backoff.next_delay("still-failing");

        // Still inside the window: kept
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        backoff.next_delay("still-failing");
        assert_eq!(backoff.states.lock().unwrap().len(), 2);

        tokio::time::advance(Duration::from_secs(60)).await;
        backoff.next_delay("still-failing");
        assert!(!backoff.reset("deleted-while-failing"));
        assert_eq!(backoff.next_delay("still-failing"), (Duration::from_secs(180), 4));
    }
}
