//! Error types for the request layer
//!
//! Every failure leaving the client is a [`ClassifiedError`]: one [`ErrorKind`]
//! from a closed taxonomy plus the diagnostics needed to trace it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;

static NEXT_CORRELATION_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique, monotonically increasing correlation id.
pub fn next_correlation_id() -> u64 {
    NEXT_CORRELATION_ID.fetch_add(1, Ordering::Relaxed)
}

// == Network Kind ==
/// Subkind of a connection-level failure (no HTTP response was received).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkKind {
    /// Connection refused, reset or aborted
    Connect,
    /// Host name lookup failed
    Dns,
    /// The socket or request timed out
    Timeout,
    /// Certificate or TLS handshake failure
    Ssl,
    /// Any other transport failure
    Unknown,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkKind::Connect => "connect",
            NetworkKind::Dns => "dns",
            NetworkKind::Timeout => "timeout",
            NetworkKind::Ssl => "ssl",
            NetworkKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

// == Error Kind ==
/// Closed taxonomy of failures a request can end in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// 401: the API key was rejected
    #[error("authentication failed")]
    Authentication,

    /// 404: the requested resource does not exist
    #[error("resource not found")]
    NotFound,

    /// 400: the API rejected the request parameters
    #[error("validation failed: {0}")]
    Validation(String),

    /// 429: the API rate limit was hit; retry after the given number of seconds
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// No HTTP response was received
    #[error("network error ({kind}): {message}")]
    Network { kind: NetworkKind, message: String },

    /// 500/502/503/504
    #[error("server error (status {status})")]
    ServerError { status: u16 },

    /// Internal cache operation failure
    #[error("cache error: {0}")]
    Cache(String),

    /// Invalid limiter, cache or client construction parameters
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The caller cancelled the request or its deadline elapsed
    #[error("request cancelled: {0}")]
    Cancelled(String),

    /// A successful response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Any status the taxonomy does not map
    #[error("unexpected API error (status {status:?}): {body}")]
    Unknown { status: Option<u16>, body: String },
}

impl ErrorKind {
    // == Retryable ==
    /// Whether the retry policy may re-attempt a request that failed this way.
    ///
    /// Certificate failures are connection-level but never heal on their own,
    /// so they surface immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::ServerError { .. } => true,
            ErrorKind::Network { kind, .. } => *kind != NetworkKind::Ssl,
            ErrorKind::Authentication
            | ErrorKind::NotFound
            | ErrorKind::Validation(_)
            | ErrorKind::RateLimited { .. }
            | ErrorKind::Cache(_)
            | ErrorKind::Configuration(_)
            | ErrorKind::Cancelled(_)
            | ErrorKind::Decode(_)
            | ErrorKind::Unknown { .. } => false,
        }
    }
}

// == Request Label ==
/// Method and URL of the request an error belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLabel {
    pub method: String,
    pub url: String,
}

impl fmt::Display for RequestLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

// == Classified Error ==
/// A terminal, immutable failure description.
#[derive(Error, Debug, Clone)]
#[error("{kind} [{}] (attempts: {attempts}, correlation id: {correlation_id})", request_display(.request))]
pub struct ClassifiedError {
    /// What went wrong
    pub kind: ErrorKind,
    /// The request that failed; absent for construction-time failures
    pub request: Option<RequestLabel>,
    /// Process-unique id for tracing this failure through logs
    pub correlation_id: u64,
    /// When the failure was classified
    pub timestamp: DateTime<Utc>,
    /// Transport attempts made before surfacing (0 if none were made)
    pub attempts: u32,
}

fn request_display(request: &Option<RequestLabel>) -> String {
    match request {
        Some(label) => label.to_string(),
        None => "no request".to_string(),
    }
}

impl ClassifiedError {
    /// Creates an error for the given request.
    pub fn new(kind: ErrorKind, request: RequestLabel) -> Self {
        Self {
            kind,
            request: Some(request),
            correlation_id: next_correlation_id(),
            timestamp: Utc::now(),
            attempts: 0,
        }
    }

    /// Creates an error not tied to any request.
    pub fn detached(kind: ErrorKind) -> Self {
        Self {
            kind,
            request: None,
            correlation_id: next_correlation_id(),
            timestamp: Utc::now(),
            attempts: 0,
        }
    }

    /// Shorthand for an [`ErrorKind::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::detached(ErrorKind::Configuration(message.into()))
    }

    /// Shorthand for an [`ErrorKind::Cache`] error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::detached(ErrorKind::Cache(message.into()))
    }

    /// Records how many attempts were made before this error surfaced.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Whether the retry policy may re-attempt after this error.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Seconds to wait before retrying, for rate-limited errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self.kind {
            ErrorKind::RateLimited { retry_after } => Some(retry_after),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the request layer.
pub type Result<T> = std::result::Result<T, ClassifiedError>;
