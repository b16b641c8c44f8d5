//! Retry with exponential backoff and jitter.
//!
//! Wraps a single asynchronous operation with automatic retry on transient
//! failure. Classification defaults to [`Error::is_retriable`] and can be
//! overridden per call.

use crate::{Error, ErrorContext, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff policy for a single logical call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retries after the initial attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Create a new policy with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before attempt `attempt + 1`:
    /// `min(base * 2^attempt + jitter, max_delay)` with jitter uniform in
    /// `[0, 0.1 * exponential]`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let max_secs = self.max_delay.as_secs_f64();
        let exp_secs = self.base_delay.as_secs_f64() * 2f64.powi(attempt.min(63) as i32);
        if !exp_secs.is_finite() || exp_secs >= max_secs {
            return self.max_delay;
        }
        let jitter = rand::rng().random_range(0.0..=0.1 * exp_secs);
        Duration::from_secs_f64((exp_secs + jitter).min(max_secs))
    }

    /// Run `operation` with up to `max_retries` retries on transient failure.
    ///
    /// The final failure surfaced to the caller is the *last* observed one,
    /// never a synthetic "max retries" error. A non-retriable failure is
    /// propagated immediately with no further waiting.
    pub async fn run<T, F, Fut, C>(&self, operation: F, is_retriable: C) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&Error) -> bool,
    {
        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt == self.max_retries || !is_retriable(&err) {
                        return Err(err);
                    }
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure; backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        // The loop always returns on the last attempt; this is defensive only.
        Err(Error::runtime_with_context(
            "retry loop exited without running an attempt",
            ErrorContext::new().with_source("retry"),
        ))
    }

    /// [`run`](Self::run) with the default classifier.
    pub async fn run_default<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(operation, |err| err.is_retriable()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(10))
    }

    #[test]
    fn test_backoff_delay_bounds() {
        let policy = RetryPolicy::new()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(60));
        for attempt in 0..6u32 {
            let exp = 2f64.powi(attempt as i32);
            for _ in 0..50 {
                let delay = policy.backoff_delay(attempt).as_secs_f64();
                assert!(delay >= exp, "attempt {}: {} < {}", attempt, delay, exp);
                assert!(
                    delay <= exp * 1.1,
                    "attempt {}: {} > {}",
                    attempt,
                    delay,
                    exp * 1.1
                );
            }
        }
    }

    #[test]
    fn test_backoff_delay_caps_at_max() {
        let policy = RetryPolicy::new()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(60));
        // 2^10 = 1024s, far past the cap
        assert_eq!(policy.backoff_delay(10), Duration::from_secs(60));
        // absurd attempt counts must not overflow or panic
        assert_eq!(policy.backoff_delay(u32::MAX), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = fast_policy(3)
            .run_default(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::network(NetworkErrorKind::Timeout, "request timed out")) }
            })
            .await;

        // initial attempt + 3 retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert!(matches!(result, Err(Error::Network { .. })));
    }

    #[tokio::test]
    async fn test_non_retriable_failure_stops_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = fast_policy(5)
            .run_default(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::remote(400, "invalid request")) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(Error::Remote { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = fast_policy(3)
            .run_default(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Error::remote(503, "overloaded"))
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_last_failure_is_propagated() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = fast_policy(2)
            .run_default(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { Err(Error::remote(500 + n as u16, "server error")) }
            })
            .await;

        // 500 is retriable, 501 is not: the loop stops on the second attempt
        // and surfaces that failure, not the first one
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        match result {
            Err(Error::Remote { status, .. }) => assert_eq!(status, 501),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_custom_classifier_overrides_default() {
        let attempts = AtomicU32::new(0);
        // default classifier would retry a 503; this one refuses everything
        let result: Result<()> = fast_policy(5)
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(Error::remote(503, "overloaded")) }
                },
                |_| false,
            )
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
