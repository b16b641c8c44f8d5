//! Governor configuration.
//!
//! Constructor-time knobs, fixed for the lifetime of a governor instance.
//! Invalid values are rejected at construction, not tolerated at call time.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`RequestGovernor`](crate::RequestGovernor).
///
/// The rate limit can be expressed either as an explicit `capacity` /
/// `refill_rate_per_sec` pair or through the
/// [`from_requests_per_minute`](GovernorConfig::from_requests_per_minute)
/// convenience constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Maximum tokens the bucket can hold (burst size).
    pub capacity: u32,
    /// Tokens added per second.
    pub refill_rate_per_sec: f64,
    /// Maximum retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Upper bound on any single backoff delay.
    pub max_delay: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self::from_requests_per_minute(60.0)
    }
}

impl GovernorConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive capacity and refill rate from a requests-per-minute budget.
    ///
    /// The bucket may burst up to one minute's worth of requests and refills
    /// at `rpm / 60` tokens per second.
    pub fn from_requests_per_minute(rpm: f64) -> Self {
        Self {
            capacity: rpm.ceil().max(1.0) as u32,
            refill_rate_per_sec: rpm / 60.0,
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Set the maximum tokens (burst size)
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the refill rate (tokens per second)
    pub fn with_refill_rate(mut self, rate: f64) -> Self {
        self.refill_rate_per_sec = rate;
        self
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base backoff delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum backoff delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Reject invalid configurations before any state is built on them.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::configuration_with_context(
                "capacity must be >= 1; a zero-capacity bucket can never issue a token",
                ErrorContext::new()
                    .with_field_path("config.capacity")
                    .with_source("governor_config"),
            ));
        }
        if !self.refill_rate_per_sec.is_finite() || self.refill_rate_per_sec <= 0.0 {
            return Err(Error::configuration_with_context(
                "refill_rate_per_sec must be a finite value > 0",
                ErrorContext::new()
                    .with_field_path("config.refill_rate_per_sec")
                    .with_details(format!("got {}", self.refill_rate_per_sec))
                    .with_source("governor_config"),
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(Error::configuration_with_context(
                "base_delay must not exceed max_delay",
                ErrorContext::new()
                    .with_field_path("config.base_delay")
                    .with_source("governor_config"),
            ));
        }
        Ok(())
    }
}
