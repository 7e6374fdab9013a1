//! Bounded retry for transient collaborator errors.
//!
//! A [`RetryPolicy`] is plain data: an attempt budget, a fixed pause and
//! the error kinds worth retrying. Steps wrap the single collaborator call
//! that may hit contention (the infra apply) with [`RetryPolicy::retry`].

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ErrorKind, Result};

/// Default number of attempts for state-lock contention.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default pause between attempts.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(60);

/// Retry policy applied around one fallible async operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub pause: Duration,
    /// Error kinds that trigger another attempt.
    pub retryable: Vec<ErrorKind>,
}

impl RetryPolicy {
    /// Retries only infra state-lock contention.
    #[must_use]
    pub fn state_lock(max_attempts: u32, pause: Duration) -> Self {
        Self {
            max_attempts,
            pause,
            retryable: vec![ErrorKind::InfraStateLocked],
        }
    }

    /// Never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            pause: Duration::ZERO,
            retryable: Vec::new(),
        }
    }

    /// Returns true if errors of this kind are retried.
    #[must_use]
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable
    /// error, or the attempt budget is spent. The last error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn retry<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let budget = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{label} succeeded on attempt {attempt}/{budget}");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < budget && self.is_retryable(err.kind()) => {
                    warn!(
                        "{label} failed on attempt {attempt}/{budget}, retrying in {}s: {err}",
                        self.pause.as_secs()
                    );
                    if !self.pause.is_zero() {
                        tokio::time::sleep(self.pause).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::state_lock(DEFAULT_MAX_ATTEMPTS, DEFAULT_PAUSE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InfraError, OrchestratorError};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_state_lock_then_succeeds() {
        let policy = RetryPolicy::state_lock(3, Duration::ZERO);
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = policy
            .retry("apply", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(OrchestratorError::from(InfraError::state_locked("locked")))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_returned_immediately() {
        let policy = RetryPolicy::state_lock(3, Duration::ZERO);
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = policy
            .retry("apply", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(OrchestratorError::from(InfraError::apply("apply failed...")))
            })
            .await;

        assert_eq!(result.map_err(|e| e.to_string()), Err(String::from("apply failed...")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_exhausted_returns_last_error() {
        let policy = RetryPolicy::state_lock(2, Duration::ZERO);
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = policy
            .retry("apply", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(OrchestratorError::from(InfraError::state_locked("still locked")))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_none_policy_retries_nothing() {
        let policy = RetryPolicy::none();
        assert!(!policy.is_retryable(ErrorKind::InfraStateLocked));
        assert_eq!(policy.max_attempts, 1);
    }
}
