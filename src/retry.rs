use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(20);
const BACKOFF_FACTOR: u32 = 2;

/// Errors that can be passed through [`RetryPolicy::retry`].
///
/// Returning `true` from `skips_retry` marks the error as a clean "skip this
/// run" signal: it is propagated on first occurrence and no further attempts
/// are made.
pub trait Retryable {
    fn skips_retry(&self) -> bool {
        false
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: DEFAULT_MAX_DELAY.max(initial_delay),
        }
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let scaled = self
            .initial_delay
            .saturating_mul(BACKOFF_FACTOR.saturating_pow(exponent));
        scaled.min(self.max_delay)
    }

    /// Run `operation` until it succeeds or `max_attempts` is exhausted.
    ///
    /// The last error is returned when every attempt fails. An error whose
    /// [`Retryable::skips_retry`] is true is returned immediately.
    pub async fn retry<T, E, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            info!(operation = operation_name, attempt, max_attempts, "attempting");

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if err.skips_retry() {
                info!(operation = operation_name, "not retrying: run will be skipped");
                return Err(err);
            }

            warn!(operation = operation_name, attempt, error = %err, "attempt failed");

            if attempt >= max_attempts {
                warn!(operation = operation_name, attempts = attempt, "giving up");
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            info!(operation = operation_name, delay_ms = delay.as_millis() as u64, "retrying");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use thiserror::Error;

    #[derive(Debug, Error)]
    enum TestError {
        #[error("transient")]
        Transient,
        #[error("skip")]
        Skip,
    }

    impl Retryable for TestError {
        fn skips_retry(&self) -> bool {
            matches!(self, TestError::Skip)
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(5));
        assert_eq!(policy.max_delay, Duration::from_secs(20));
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(3), Duration::from_secs(20));
        assert_eq!(policy.delay_for(4), Duration::from_secs(20));
        assert_eq!(policy.delay_for(40), Duration::from_secs(20));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::from_millis(1)).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = Cell::new(0);
        let result: Result<u32, TestError> = fast_policy(3)
            .retry("op", || {
                calls.set(calls.get() + 1);
                async { Ok(7) }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<&str, TestError> = fast_policy(3)
            .retry("op", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(TestError::Transient)
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let calls = Cell::new(0);
        let result: Result<(), TestError> = fast_policy(4)
            .retry("op", || {
                calls.set(calls.get() + 1);
                async { Err(TestError::Transient) }
            })
            .await;
        assert!(matches!(result, Err(TestError::Transient)));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn test_skip_error_short_circuits() {
        let calls = Cell::new(0);
        let result: Result<(), TestError> = fast_policy(5)
            .retry("op", || {
                calls.set(calls.get() + 1);
                async { Err(TestError::Skip) }
            })
            .await;
        assert!(matches!(result, Err(TestError::Skip)));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_skip_after_transient_still_stops() {
        let calls = Cell::new(0);
        let result: Result<(), TestError> = fast_policy(5)
            .retry("op", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n == 1 {
                        Err(TestError::Transient)
                    } else {
                        Err(TestError::Skip)
                    }
                }
            })
            .await;
        assert!(matches!(result, Err(TestError::Skip)));
        assert_eq!(calls.get(), 2);
    }
}
