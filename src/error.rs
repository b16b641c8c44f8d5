use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "config.capacity")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "token_bucket", "drain_loop")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Network failure categories observed on the transport path.
///
/// The wrapped operations are expected to map their transport-level failures
/// onto these kinds so the default retriability classifier can act on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    ConnectionLost,
    NotConnected,
    Timeout,
    DnsFailure,
    CannotConnect,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkErrorKind::ConnectionLost => "connection lost",
            NetworkErrorKind::NotConnected => "not connected",
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::DnsFailure => "dns failure",
            NetworkErrorKind::CannotConnect => "cannot connect to host",
        };
        f.write_str(s)
    }
}

/// Unified error type for the governor.
///
/// This aggregates the failure vocabulary the governor and its callers share:
/// transient network/server failures, explicit rate-limit signals, cancellation
/// of queued work, and construction-time configuration errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("Remote error: HTTP {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        /// Wait the remote service asked for, when it provided one.
        retry_after: Option<Duration>,
    },

    #[error("Rate limit exceeded{}", format_retry_after(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("Request cancelled before it ran")]
    Cancelled,

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {:.1}s)", d.as_secs_f64()),
        None => String::new(),
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    pub fn network(kind: NetworkErrorKind, msg: impl Into<String>) -> Self {
        Error::Network {
            kind,
            message: msg.into(),
        }
    }

    pub fn remote(status: u16, msg: impl Into<String>) -> Self {
        Error::Remote {
            status,
            message: msg.into(),
            retry_after: None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Default transient/permanent classification.
    ///
    /// - Network-category failures are retriable.
    /// - Server-side failures with status 500/502/503/504, or whose message
    ///   contains "timeout" or "connection" (case-insensitive), are retriable.
    /// - Everything else (4xx-class client errors, malformed input,
    ///   content-policy rejections, cancellation) is not.
    ///
    /// An explicit [`Error::RateLimited`] signal is transient, but it is
    /// handled by the governor's dedicated rate-limit path rather than the
    /// generic retry loop, so this classifier reports it non-retriable.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Network { .. } => true,
            Error::Remote {
                status, message, ..
            } => {
                if matches!(status, 500 | 502 | 503 | 504) {
                    return true;
                }
                let m = message.to_lowercase();
                m.contains("timeout") || m.contains("connection")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_are_retriable() {
        for kind in [
            NetworkErrorKind::ConnectionLost,
            NetworkErrorKind::NotConnected,
            NetworkErrorKind::Timeout,
            NetworkErrorKind::DnsFailure,
            NetworkErrorKind::CannotConnect,
        ] {
            assert!(Error::network(kind, "boom").is_retriable());
        }
    }

    #[test]
    fn test_transient_server_statuses_are_retriable() {
        for status in [500, 502, 503, 504] {
            assert!(Error::remote(status, "server error").is_retriable());
        }
    }

    #[test]
    fn test_remote_message_substrings_are_retriable() {
        assert!(Error::remote(400, "Gateway Timeout while proxying").is_retriable());
        assert!(Error::remote(400, "CONNECTION reset by peer").is_retriable());
        assert!(!Error::remote(400, "invalid request body").is_retriable());
    }

    #[test]
    fn test_client_errors_are_not_retriable() {
        assert!(!Error::remote(401, "bad api key").is_retriable());
        assert!(!Error::remote(422, "malformed payload").is_retriable());
        assert!(!Error::Cancelled.is_retriable());
        assert!(!Error::RateLimited { retry_after: None }.is_retriable());
    }

    #[test]
    fn test_context_formatting() {
        let err = Error::configuration_with_context(
            "capacity must be >= 1",
            ErrorContext::new()
                .with_field_path("config.capacity")
                .with_source("governor_config"),
        );
        let s = err.to_string();
        assert!(s.contains("capacity must be >= 1"));
        assert!(s.contains("config.capacity"));
    }
}
