//! Fixed-delay retry for rate-limited calls
//!
//! Only upstream overload (`LLMError::is_rate_limited`) is retried. Any other
//! error is returned on the spot so callers can turn it into a reply.

use std::future::Future;
use std::time::Duration;

use super::{LLMError, Result};

/// Retry budget: at most `max_attempts` calls, `backoff` between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A single attempt, no retry
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `op` until it succeeds, fails with a non-rate-limit error, or the
    /// budget is spent.
    ///
    /// Returns `LLMError::RetriesExhausted` when every attempt was rate limited.
    /// There is no sleep after the final attempt.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_rate_limited() => {
                    tracing::warn!(
                        "{} attempt {}/{} rate limited: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        e
                    );

                    if attempt >= self.max_attempts {
                        return Err(LLMError::RetriesExhausted { attempts: attempt });
                    }

                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => {
                    tracing::warn!("{} attempt {} failed: {}", label, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
