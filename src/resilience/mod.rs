//! # Resilience Primitives Module
//!
//! This module provides the building blocks the governor composes to keep
//! outbound calls inside an external API budget and to survive transient
//! failures.
//!
//! ## Overview
//!
//! Resilience patterns are essential for production AI applications to:
//! - Stay within an agreed requests-per-interval budget
//! - Recover from transient network and server failures automatically
//! - Fail fast on permanent errors instead of retrying hopeless calls
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`token_bucket`] | Token bucket rate limiter for throughput control |
//! | [`retry`] | Exponential backoff with jitter for transient failures |
//!
//! ## Token Bucket
//!
//! The token bucket admits one request per token and refills at a fixed rate:
//!
//! ```rust
//! use request_governor::resilience::token_bucket::TokenBucket;
//!
//! # async fn demo() -> request_governor::Result<()> {
//! let bucket = TokenBucket::new(10, 2.0)?; // burst 10, 2 tokens/sec
//!
//! if bucket.try_consume().await {
//!     // Proceed with request...
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retry
//!
//! The retry policy wraps a single async operation:
//!
//! ```rust,no_run
//! use request_governor::resilience::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! # async fn demo() -> request_governor::Result<()> {
//! let policy = RetryPolicy::new()
//!     .with_max_retries(3)
//!     .with_base_delay(Duration::from_secs(1));
//!
//! let response = policy
//!     .run_default(|| async { make_api_call().await })
//!     .await?;
//! # Ok(())
//! # }
//! # async fn make_api_call() -> request_governor::Result<String> { Ok(String::new()) }
//! ```

pub mod retry;
pub mod token_bucket;
