//! Bounded timeout and retry for collaborator calls
//!
//! Every call to the embedding service, completion service, or vector store
//! goes through a [`RetryPolicy`]: each attempt is bounded by a timeout, and
//! retryable failures are repeated with exponential backoff.

use crate::config::RetryConfig;
use crate::{Collaborator, DocqaError, Result};
use std::future::Future;
use std::time::Duration;

/// Timeout and retry settings applied to one collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first (at least 1)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for the delay
    pub max_backoff: Duration,

    /// Per-attempt timeout
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Create from config
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            timeout: config.timeout(),
        }
    }

    /// A single attempt with the given timeout
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            timeout,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts.
    pub async fn run<T, F, Fut>(&self, collaborator: Collaborator, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(DocqaError::Timeout {
                    collaborator,
                    timeout: self.timeout,
                }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        %collaborator,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Collaborator call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(250),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = policy(5);
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(250));
        assert_eq!(policy.backoff(30), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = policy(3)
            .run(Collaborator::Embedding, move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DocqaError::unavailable(Collaborator::Embedding, "refused"))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = policy(2)
            .run(Collaborator::VectorStore, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DocqaError::unavailable(Collaborator::VectorStore, "down"))
            })
            .await;

        assert!(matches!(
            result,
            Err(DocqaError::CollaboratorUnavailable { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = policy(5)
            .run(Collaborator::Embedding, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DocqaError::DimensionMismatch {
                    expected: 1024,
                    actual: 768,
                })
            })
            .await;

        assert!(matches!(result, Err(DocqaError::DimensionMismatch { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout() {
        let policy = RetryPolicy::no_retry(Duration::from_millis(50));
        let result: Result<()> = policy
            .run(Collaborator::Completion, || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(DocqaError::Timeout {
                collaborator: Collaborator::Completion,
                ..
            })
        ));
    }

    #[test]
    fn test_from_config_clamps_attempts() {
        let config = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 1);
    }
}
