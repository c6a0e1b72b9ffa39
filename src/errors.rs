//! Error taxonomy for endpoint resolution and analysis dispatch.
//!
//! Every failure an analysis call can produce falls into one of four
//! operational buckets, and callers must be able to tell them apart:
//!
//! - [`DispatchError::Configuration`]: no usable endpoint. Fatal at startup.
//!   [`DispatchError::NotBound`] is its runtime form: the binding was
//!   invalidated and not resolved again before a dispatch.
//! - [`DispatchError::Transport`]: the backend could not be reached. Retryable.
//! - [`DispatchError::EndpointMismatch`]: something answered, but it is not the
//!   analysis backend (stale route, static host fallback). Re-resolve.
//! - [`DispatchError::Remote`]: the right backend rejected the request.
//!
//! # Error Codes
//!
//! - E020-E029: configuration errors
//! - E060-E069: transport errors
//! - E070-E079: endpoint identity errors
//! - E080-E089: remote application errors
//! - E090: cancellation
//!
//! # Example
//!
//! ```rust
//! use insightlink::errors::{DispatchError, ErrorCode};
//!
//! let err = DispatchError::configuration("no valid endpoint");
//! assert_eq!(err.code(), ErrorCode::CONFIG_NO_ENDPOINT);
//! assert!(!err.is_retryable());
//! assert!(err.is_user_fixable());
//! ```

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error code for documentation and programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    /// Config error - no source produced a valid endpoint
    pub const CONFIG_NO_ENDPOINT: ErrorCode = ErrorCode("E020");
    /// Config error - configuration file could not be parsed
    pub const CONFIG_PARSE: ErrorCode = ErrorCode("E021");
    /// Config error - configuration file could not be read
    pub const CONFIG_READ: ErrorCode = ErrorCode("E022");
    /// Config error - invalid value
    pub const CONFIG_INVALID: ErrorCode = ErrorCode("E023");
    /// Config error - dispatch attempted while the binding is invalidated
    pub const CONFIG_UNBOUND: ErrorCode = ErrorCode("E024");

    /// Transport error - request timed out
    pub const TRANSPORT_TIMEOUT: ErrorCode = ErrorCode("E060");
    /// Transport error - connection refused or reset
    pub const TRANSPORT_CONNECT: ErrorCode = ErrorCode("E061");
    /// Transport error - host name did not resolve
    pub const TRANSPORT_DNS: ErrorCode = ErrorCode("E062");
    /// Transport error - generic
    pub const TRANSPORT_GENERIC: ErrorCode = ErrorCode("E069");

    /// Endpoint error - response came from the wrong backend
    pub const ENDPOINT_MISMATCH: ErrorCode = ErrorCode("E070");

    /// Remote error - client-side request rejected (4xx)
    pub const REMOTE_REJECTED: ErrorCode = ErrorCode("E080");
    /// Remote error - backend failure (5xx)
    pub const REMOTE_FAILURE: ErrorCode = ErrorCode("E081");
    /// Remote error - unexpected status outside 4xx/5xx
    pub const REMOTE_UNEXPECTED: ErrorCode = ErrorCode("E089");

    /// The call was cancelled by its caller
    pub const CANCELLED: ErrorCode = ErrorCode("E090");

    /// Get the error code string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a request never produced an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportErrorKind {
    Timeout,
    ConnectionRefused,
    Dns,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "connection refused",
            Self::Dns => "dns failure",
            Self::Other => "request failure",
        };
        f.write_str(label)
    }
}

/// A single failed attempt at the transport level.
///
/// Produced by [`Transport`](crate::client::Transport) implementations and
/// folded into [`DispatchError::Transport`] once retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportFailure {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connection_refused(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConnectionRefused, message)
    }

    pub fn dns(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Dns, message)
    }
}

/// Errors surfaced by resolution and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No configuration source yielded a valid endpoint.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The binding was invalidated and nobody has resolved it again.
    #[error("endpoint binding is not resolved (last epoch {epoch}); call resolve() before dispatching")]
    NotBound { epoch: u64 },

    /// The backend could not be reached after all permitted attempts.
    #[error("transport error after {attempts} attempt(s) against {endpoint}: {last}")]
    Transport {
        endpoint: String,
        attempts: u32,
        #[source]
        last: TransportFailure,
    },

    /// A success status came back, but from something that is not the
    /// analysis backend.
    #[error("endpoint mismatch at {endpoint} (epoch {epoch}): {reason}")]
    EndpointMismatch {
        endpoint: String,
        epoch: u64,
        reason: String,
    },

    /// The backend answered with a non-success status.
    #[error("remote error: HTTP {status_code}")]
    Remote { status_code: u16, body: String },

    /// The caller cancelled the call before it completed.
    #[error("analysis cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl DispatchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn remote(status_code: u16, body: impl Into<String>) -> Self {
        Self::Remote {
            status_code,
            body: body.into(),
        }
    }

    /// Get the structured error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration { .. } => ErrorCode::CONFIG_NO_ENDPOINT,
            Self::NotBound { .. } => ErrorCode::CONFIG_UNBOUND,
            Self::Transport { last, .. } => match last.kind {
                TransportErrorKind::Timeout => ErrorCode::TRANSPORT_TIMEOUT,
                TransportErrorKind::ConnectionRefused => ErrorCode::TRANSPORT_CONNECT,
                TransportErrorKind::Dns => ErrorCode::TRANSPORT_DNS,
                TransportErrorKind::Other => ErrorCode::TRANSPORT_GENERIC,
            },
            Self::EndpointMismatch { .. } => ErrorCode::ENDPOINT_MISMATCH,
            Self::Remote { status_code, .. } => match status_code {
                400..=499 => ErrorCode::REMOTE_REJECTED,
                500..=599 => ErrorCode::REMOTE_FAILURE,
                _ => ErrorCode::REMOTE_UNEXPECTED,
            },
            Self::Cancelled { .. } => ErrorCode::CANCELLED,
        }
    }

    /// Whether retrying against the same endpoint can help.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether the user can fix this by changing configuration or input.
    #[must_use]
    pub fn is_user_fixable(&self) -> bool {
        match self {
            Self::Configuration { .. }
            | Self::NotBound { .. }
            | Self::EndpointMismatch { .. } => true,
            Self::Remote { status_code, .. } => (400..500).contains(status_code),
            Self::Transport { .. } | Self::Cancelled { .. } => false,
        }
    }

    /// Whether the caller should invalidate the binding and resolve again
    /// with corrected configuration.
    #[must_use]
    pub fn suggests_reresolve(&self) -> bool {
        matches!(self, Self::EndpointMismatch { .. })
    }

    /// Short category label for reports and logs.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } | Self::NotBound { .. } => "configuration",
            Self::Transport { .. } => "transport",
            Self::EndpointMismatch { .. } => "endpoint-mismatch",
            Self::Remote { .. } => "remote",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Errors raised while loading `.insightlink.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration value for `{field}`: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::CONFIG_READ,
            Self::Parse { .. } => ErrorCode::CONFIG_PARSE,
            Self::Invalid { .. } => ErrorCode::CONFIG_INVALID,
        }
    }
}
