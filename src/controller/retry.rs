//! # Rate-Limit Retry
//!
//! Retries an upstream call only when it failed because of rate limiting. Every other
//! failure is returned after the first attempt. Delays double per attempt from the base
//! delay with up to ±10% jitter, and the wait is abandoned as soon as the cancellation token
//! fires.

use crate::constants::RATE_LIMIT_JITTER_FRACTION;
use crate::observability::metrics;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Whether an error message describes a rate-limit rejection
pub fn is_rate_limit_error(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("rate limit") || message.contains("429") || message.contains("too many requests")
}

/// Errors that can say whether they are a rate-limit rejection
///
/// The default inspects the rendered message. Types whose messages embed identifiers (which
/// may contain "429") override it.
pub trait RateLimitClassify: std::error::Error {
    fn is_rate_limit(&self) -> bool {
        is_rate_limit_error(&self.to_string())
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Still rate limited after every allowed attempt
    #[error("max retries exceeded after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        source: E,
    },
    /// The wait before the next attempt was cancelled
    #[error("cancelled while backing off after {attempts} attempts")]
    Cancelled { attempts: u32 },
    /// A failure that is not retried
    #[error(transparent)]
    Failed(E),
}

/// Bounded exponential back-off for rate-limited calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    kind: &'static str,
}

impl RetryPolicy {
    /// `max_retries + 1` attempts at most
    pub fn new(kind: &'static str, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            kind,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// `base_delay * 2^(attempt-1)` with ±10% jitter
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter = rand::rng().random_range(-RATE_LIMIT_JITTER_FRACTION..=RATE_LIMIT_JITTER_FRACTION);
        delay.mul_f64(1.0 + jitter)
    }

    /// Run `operation`, retrying rate-limit failures
    pub async fn retry<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: RateLimitClassify + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_rate_limit() {
                return Err(RetryError::Failed(error));
            }

            if attempt >= max_attempts {
                warn!(
                    kind = self.kind,
                    attempts = attempt,
                    error = %error,
                    "rate limited, giving up"
                );
                return Err(RetryError::MaxRetriesExceeded {
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = self.delay_for(attempt);
            metrics::increment_rate_limit_retries(self.kind);
            debug!(
                kind = self.kind,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "rate limited, backing off"
            );

            tokio::select! {
                () = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
