//! # request-governor
//!
//! Resilient request orchestration for generation APIs: token-bucket rate
//! limiting, priority queuing, and retry with exponential backoff.
//!
//! ## Overview
//!
//! This library sits between an application and an external generation API.
//! Callers hand the governor arbitrary asynchronous operations (each one an
//! outbound call); the governor keeps them inside an agreed
//! requests-per-interval budget, queues what cannot run immediately, and
//! retries transient failures so callers only ever see a success or a final,
//! meaningful failure.
//!
//! ## Core Philosophy
//!
//! - **Explicit ownership**: one governor per logical API client, passed by
//!   reference. No process-wide singletons.
//! - **Cooperative suspension**: waits for tokens and backoff delays are
//!   async sleeps, never thread-blocking.
//! - **Honest failures**: the governor retries transparently within policy or
//!   propagates the original failure unchanged; it never swallows one.
//!
//! ## Key Features
//!
//! - **Governed execution**: [`RequestGovernor::execute_request`] admits the
//!   common case immediately and queues the rest (priority first, FIFO within
//!   a priority tier)
//! - **Retry with backoff**: [`RequestGovernor::execute_with_retry`] and the
//!   standalone [`resilience::retry::RetryPolicy`], with a default
//!   transient/permanent classifier callers can override
//! - **Rate-limit awareness**: explicit rate-limit-exceeded signals pause the
//!   governor for the advertised budget and notify observers via [`EventSink`]
//! - **Observability**: facts-only snapshots of bucket and queue state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use request_governor::{GovernorConfig, Priority, RequestGovernor};
//!
//! #[tokio::main]
//! async fn main() -> request_governor::Result<()> {
//!     let governor = RequestGovernor::new(GovernorConfig::from_requests_per_minute(60.0))?;
//!
//!     let summary = governor
//!         .execute_request(Priority::Normal, || async {
//!             // call the generation API here
//!             Ok::<_, request_governor::Error>("key points".to_string())
//!         })
//!         .await?;
//!
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`governor`] | Request governor: rate limiting + queuing + retry |
//! | [`resilience`] | Token bucket and backoff primitives |
//! | [`config`] | Constructor-time configuration |
//! | [`events`] | Fire-and-forget event notifications |

pub mod config;
pub mod events;
pub mod governor;
pub mod resilience;

// Re-export main types for convenience
pub use config::GovernorConfig;
pub use events::{
    noop_sink, CompositeEventSink, EventSink, GovernorEvent, InMemoryEventSink, NoopEventSink,
};
pub use governor::{GovernorSnapshot, Priority, RateLimitInfo, RequestGovernor};
pub use resilience::retry::RetryPolicy;
pub use resilience::token_bucket::{TokenBucket, TokenBucketSnapshot};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, NetworkErrorKind};
