//! Advisory rate-limit metadata from the remote service.

use std::time::{Duration, Instant};

/// Wait applied when the remote signals rate-limit-exceeded without any
/// usable reset information.
pub(crate) const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Last-known rate-limit budget reported by the remote service (e.g. from
/// response headers). Advisory only: it informs the wait after an explicit
/// rate-limit-exceeded signal and never alters the local bucket simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitInfo {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_time: Option<Instant>,
}

impl RateLimitInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_remaining(mut self, remaining: u32) -> Self {
        self.remaining = Some(remaining);
        self
    }

    pub fn with_reset_time(mut self, reset_time: Instant) -> Self {
        self.reset_time = Some(reset_time);
        self
    }

    /// Convenience for "the budget resets this far from now".
    pub fn resetting_in(duration: Duration) -> Self {
        Self::new().with_reset_time(Instant::now() + duration)
    }
}

/// Wait before resuming after an explicit rate-limit-exceeded signal.
///
/// Precedence: the service's `retry_after` if provided, else the tracked
/// reset time minus now (floored at zero), else a 60 second default.
pub(crate) fn wait_before_resume(
    retry_after: Option<Duration>,
    info: Option<&RateLimitInfo>,
) -> Duration {
    if let Some(wait) = retry_after {
        return wait;
    }
    if let Some(reset) = info.and_then(|i| i.reset_time) {
        return reset.saturating_duration_since(Instant::now());
    }
    DEFAULT_RATE_LIMIT_WAIT
}
