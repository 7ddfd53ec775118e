//! Retry policy for network writes
//!
//! Wraps each write the session issues. Only failures the API marks as
//! retriable (transport errors, 5xx, 429) are retried; a 4xx fails at once.

use std::future::Future;
use std::time::Duration;

use crate::client::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (minimum 1)
    pub max_attempts: usize,
    /// Delay before the first retry; doubles after each attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Backoff before retry number `attempt` (0-based): base, 2x base, 4x base, ...
    pub fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `operation` until it succeeds, fails with a non-retriable error,
    /// or the attempt budget is spent
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!("{} succeeded after {} retry(ies)", label, attempt);
                    }
                    return Ok(value);
                }

                Err(e) if e.is_retriable() && attempt + 1 < max_attempts => {
                    let backoff = self.backoff(attempt);
                    tracing::debug!(
                        "{} failed on attempt {}/{}: {}. Retrying in {:?}",
                        label,
                        attempt + 1,
                        max_attempts,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }

                Err(e) => {
                    if e.is_retriable() {
                        tracing::warn!("{} gave up after {} attempt(s): {}", label, max_attempts, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
