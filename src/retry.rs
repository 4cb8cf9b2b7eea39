//! Bounded retry with exponential backoff.
//!
//! A [`RetryPolicy`] is consumed by every operation that calls an external
//! service: the pipeline retries whole documents with it, and
//! [`RetryingEmbedder`](crate::embedding::RetryingEmbedder) retries single
//! embedding calls. Only transient errors (see [`Error::is_transient`]) are
//! retried.

use crate::error::{EmbeddingError, Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Default growth factor between retries.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default cap on any single delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

/// Retry policy for transient failures.
///
/// # Examples
///
/// ```
/// use chunkbench::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.delay_for(1), Duration::from_millis(100));
/// assert_eq!(policy.delay_for(2), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts including the first one (1 disables retries).
    pub max_attempts: u32,
    /// Delay after the first failure, in milliseconds.
    pub base_delay_ms: u64,
    /// Factor applied to the delay after each further failure.
    pub backoff_multiplier: f64,
    /// Upper bound on any delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

/// Result of a retried operation with the number of attempts made.
#[derive(Debug)]
pub struct Attempted<T> {
    /// Final result.
    pub result: Result<T>,
    /// Attempts made, at least 1.
    pub attempts: u32,
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            backoff_multiplier: 1.0,
            max_delay_ms: 0,
        }
    }

    /// Sets the maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub const fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub const fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `max_attempts` is zero or the
    /// multiplier is below 1 or not finite.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config("retry max_attempts must be >= 1"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config(format!(
                "retry backoff_multiplier must be >= 1, got {}",
                self.backoff_multiplier
            )));
        }
        Ok(())
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let delay = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Delay after a failure, honoring a rate limiter's retry-after hint.
    #[must_use]
    pub fn delay_for_error(&self, err: &Error, attempt: u32) -> Duration {
        match err {
            Error::Embedding(EmbeddingError::RateLimited {
                retry_after_ms: Some(ms),
            }) => Duration::from_millis((*ms).min(self.max_delay_ms)),
            _ => self.delay_for(attempt),
        }
    }

    /// Returns true if a failure on attempt `attempt` should be retried.
    #[must_use]
    pub const fn should_retry(&self, err: &Error, attempt: u32) -> bool {
        attempt < self.max_attempts && err.is_transient()
    }

    /// Runs `op` on the current thread, sleeping between attempts.
    pub fn run_blocking<T>(&self, mut op: impl FnMut(u32) -> Result<T>) -> Attempted<T> {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Err(err) if self.should_retry(&err, attempt) => {
                    let delay = self.delay_for_error(&err, attempt);
                    warn!(attempt, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), error = %err, "retrying after transient error");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                result => {
                    return Attempted {
                        result,
                        attempts: attempt,
                    };
                }
            }
        }
    }

    /// Runs the async operation `op`, sleeping on the tokio timer between
    /// attempts.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Err(err) if self.should_retry(&err, attempt) => {
                    let delay = self.delay_for_error(&err, attempt);
                    warn!(attempt, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), error = %err, "retrying after transient error");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => {
                    return Attempted {
                        result,
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use test_case::test_case;

    fn timeout() -> Error {
        EmbeddingError::Timeout { after_ms: 10 }.into()
    }

    #[test_case(1, 100 ; "first retry")]
    #[test_case(2, 200 ; "second retry")]
    #[test_case(3, 400 ; "third retry")]
    #[test_case(10, 5_000 ; "capped")]
    fn test_delay_for(attempt: u32, expected_ms: u64) {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn test_delay_honors_retry_after() {
        let policy = RetryPolicy::default();
        let err: Error = EmbeddingError::RateLimited {
            retry_after_ms: Some(750),
        }
        .into();
        assert_eq!(policy.delay_for_error(&err, 1), Duration::from_millis(750));

        let err: Error = EmbeddingError::RateLimited {
            retry_after_ms: Some(60_000),
        }
        .into();
        assert_eq!(policy.delay_for_error(&err, 1), Duration::from_millis(5_000));
    }

    #[test]
    fn test_should_retry_only_transient() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&timeout(), 1));
        assert!(policy.should_retry(&timeout(), 2));
        assert!(!policy.should_retry(&timeout(), 3));

        let parse: Error = ParseError::InvalidUtf8 { offset: 0 }.into();
        assert!(!policy.should_retry(&parse, 1));
        assert!(!policy.should_retry(&Error::config("bad"), 1));
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::no_retry().validate().is_ok());
        assert!(RetryPolicy::default().max_attempts(0).validate().is_err());
        assert!(RetryPolicy::default().backoff_multiplier(0.5).validate().is_err());
        assert!(RetryPolicy::default().backoff_multiplier(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_run_blocking_recovers() {
        let policy = RetryPolicy::default().base_delay_ms(0);
        let attempted = policy.run_blocking(|attempt| {
            if attempt < 3 { Err(timeout()) } else { Ok(attempt) }
        });
        assert_eq!(attempted.result.unwrap(), 3);
        assert_eq!(attempted.attempts, 3);
    }

    #[test]
    fn test_run_blocking_gives_up() {
        let policy = RetryPolicy::default().base_delay_ms(0).max_attempts(2);
        let attempted = policy.run_blocking(|_| -> Result<()> { Err(timeout()) });
        assert!(attempted.result.is_err());
        assert_eq!(attempted.attempts, 2);
    }

    #[test]
    fn test_run_blocking_does_not_retry_permanent() {
        let policy = RetryPolicy::default().base_delay_ms(0);
        let attempted =
            policy.run_blocking(|_| -> Result<()> { Err(ParseError::InvalidUtf8 { offset: 1 }.into()) });
        assert_eq!(attempted.attempts, 1);
    }

    #[tokio::test]
    async fn test_run_async_recovers() {
        let policy = RetryPolicy::default().base_delay_ms(1);
        let attempted = policy
            .run(|attempt| async move {
                if attempt == 1 { Err(timeout()) } else { Ok("done") }
            })
            .await;
        assert_eq!(attempted.result.unwrap(), "done");
        assert_eq!(attempted.attempts, 2);
    }

    #[test]
    fn test_policy_toml_defaults() {
        let policy: RetryPolicy = toml::from_str("max_attempts = 5").unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, DEFAULT_BASE_DELAY_MS);
    }
}
