use crate::{Error, ErrorContext, Result};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct TokenBucketSnapshot {
    pub capacity: u32,
    pub refill_rate_per_sec: f64,
    pub tokens: u32,
    /// Estimated wait time until a token is available (ms), if currently empty.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug)]
struct State {
    tokens: u32,
    last_refill: Instant,
}

/// Token-bucket rate limiter that locally approximates a remote budget.
///
/// Tokens are whole units: one token admits one request. The bucket starts
/// full and refills at a fixed rate, saturating at `capacity`.
pub struct TokenBucket {
    capacity: u32,
    refill_rate_per_sec: f64,
    state: Mutex<State>,
}

impl TokenBucket {
    /// Create a bucket, rejecting configurations that could never issue a token.
    pub fn new(capacity: u32, refill_rate_per_sec: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::configuration_with_context(
                "capacity must be >= 1",
                ErrorContext::new()
                    .with_field_path("capacity")
                    .with_source("token_bucket"),
            ));
        }
        if !refill_rate_per_sec.is_finite() || refill_rate_per_sec <= 0.0 {
            return Err(Error::configuration_with_context(
                "refill rate must be a finite value > 0",
                ErrorContext::new()
                    .with_field_path("refill_rate_per_sec")
                    .with_details(format!("got {}", refill_rate_per_sec))
                    .with_source("token_bucket"),
            ));
        }
        Ok(Self {
            capacity,
            refill_rate_per_sec,
            state: Mutex::new(State {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Add the tokens accrued since the last refill, saturating at capacity.
    ///
    /// `last_refill` only advances when at least one whole token accrued, so
    /// frequent sub-token calls keep accumulating elapsed time instead of
    /// discarding it.
    fn refill_locked(&self, st: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(st.last_refill).as_secs_f64();
        let accrued = (elapsed * self.refill_rate_per_sec).floor();
        if accrued >= 1.0 {
            let to_add = accrued.min(self.capacity as f64) as u32;
            st.tokens = st.tokens.saturating_add(to_add).min(self.capacity);
            st.last_refill = now;
        }
    }

    /// Refill, then consume one token if any is available.
    pub async fn try_consume(&self) -> bool {
        let mut st = self.state.lock().await;
        self.refill_locked(&mut st);
        if st.tokens > 0 {
            st.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Refill without consuming.
    pub async fn refill(&self) {
        let mut st = self.state.lock().await;
        self.refill_locked(&mut st);
    }

    /// Suspend until a token is acquired.
    ///
    /// Sleeps one refill interval between attempts; the sleep is cooperative
    /// and never blocks the underlying thread. The lock is not held across
    /// the sleep.
    pub async fn wait_for_token(&self) {
        let pause = Duration::from_secs_f64(1.0 / self.refill_rate_per_sec);
        loop {
            if self.try_consume().await {
                return;
            }
            tokio::time::sleep(pause).await;
        }
    }

    /// Forced refill to capacity, restarting the refill clock.
    ///
    /// Used after an externally signaled rate-limit wait has elapsed and the
    /// remote budget is known to be fresh.
    pub async fn reset_full(&self) {
        let mut st = self.state.lock().await;
        st.tokens = self.capacity;
        st.last_refill = Instant::now();
    }

    pub async fn snapshot(&self) -> TokenBucketSnapshot {
        let mut st = self.state.lock().await;
        self.refill_locked(&mut st);
        let estimated_wait_ms = if st.tokens == 0 {
            Some((1000.0 / self.refill_rate_per_sec).ceil() as u64)
        } else {
            None
        };
        TokenBucketSnapshot {
            capacity: self.capacity,
            refill_rate_per_sec: self.refill_rate_per_sec,
            tokens: st.tokens,
            estimated_wait_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_rejects_zero_capacity() {
        assert!(TokenBucket::new(0, 1.0).is_err());
    }

    #[test]
    fn test_bucket_rejects_bad_rate() {
        assert!(TokenBucket::new(1, 0.0).is_err());
        assert!(TokenBucket::new(1, -2.0).is_err());
        assert!(TokenBucket::new(1, f64::NAN).is_err());
        assert!(TokenBucket::new(1, f64::INFINITY).is_err());
    }

    #[tokio::test]
    async fn test_bucket_starts_full() {
        let bucket = TokenBucket::new(3, 1.0).unwrap();
        assert!(bucket.try_consume().await);
        assert!(bucket.try_consume().await);
        assert!(bucket.try_consume().await);
        assert!(!bucket.try_consume().await);
    }

    #[tokio::test]
    async fn test_bucket_never_goes_negative() {
        let bucket = TokenBucket::new(1, 0.1).unwrap();
        assert!(bucket.try_consume().await);
        // repeated consumes on an empty bucket keep returning false
        for _ in 0..5 {
            assert!(!bucket.try_consume().await);
        }
        assert_eq!(bucket.snapshot().await.tokens, 0);
    }

    #[tokio::test]
    async fn test_bucket_never_exceeds_capacity() {
        let bucket = TokenBucket::new(5, 1000.0).unwrap();
        // far more than capacity worth of refill time
        tokio::time::sleep(Duration::from_millis(50)).await;
        bucket.refill().await;
        assert_eq!(bucket.snapshot().await.tokens, 5);
    }

    #[tokio::test]
    async fn test_bucket_refills_over_time() {
        let bucket = TokenBucket::new(5, 100.0).unwrap();
        for _ in 0..5 {
            assert!(bucket.try_consume().await);
        }
        assert!(!bucket.try_consume().await);

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(bucket.try_consume().await);
    }

    #[tokio::test]
    async fn test_frequent_refills_accumulate_fractions() {
        // 10 tokens/sec: one token per 100ms. Refilling every ~25ms would
        // never accrue a whole token per call; the timestamp must not reset.
        let bucket = TokenBucket::new(10, 10.0).unwrap();
        for _ in 0..10 {
            assert!(bucket.try_consume().await);
        }
        assert_eq!(bucket.snapshot().await.tokens, 0);

        for _ in 0..8 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            bucket.refill().await;
        }
        // ~200ms elapsed: at least one whole token must have accrued
        assert!(bucket.snapshot().await.tokens >= 1);
    }

    #[tokio::test]
    async fn test_wait_for_token_suspends_until_available() {
        let bucket = TokenBucket::new(1, 20.0).unwrap();
        assert!(bucket.try_consume().await);

        let start = Instant::now();
        bucket.wait_for_token().await;
        // one token per 50ms; allow generous scheduling slack
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_reset_full_restores_capacity() {
        let bucket = TokenBucket::new(4, 0.01).unwrap();
        for _ in 0..4 {
            assert!(bucket.try_consume().await);
        }
        bucket.reset_full().await;
        assert_eq!(bucket.snapshot().await.tokens, 4);
    }

    #[tokio::test]
    async fn test_snapshot_estimates_wait_when_empty() {
        let bucket = TokenBucket::new(1, 2.0).unwrap();
        assert!(bucket.try_consume().await);
        let snap = bucket.snapshot().await;
        assert_eq!(snap.tokens, 0);
        assert_eq!(snap.estimated_wait_ms, Some(500));
    }
}
