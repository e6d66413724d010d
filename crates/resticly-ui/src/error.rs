//! Error types surfaced by the UI core.
//!
//! Every failure that crosses the request wrapper is folded into
//! [`ClientError::RequestFailed`]; the [`FailureKind`] only tells callers which
//! leg of the call broke, the message is what the user sees.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for request-level operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Where a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The endpoint path could not be joined onto the base URL.
    Endpoint,
    /// The request body could not be encoded.
    Encode,
    /// Connection, TLS or timeout failure before a status was received.
    Transport,
    /// The server answered with a non-success status.
    Protocol {
        /// HTTP status code returned by the server.
        status: u16,
    },
    /// A success response carried a body that did not match the expected shape.
    Decode,
}

/// Errors raised by the request wrapper and context construction.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A request did not produce the expected response.
    #[error("{message}")]
    RequestFailed {
        /// Failing leg of the call.
        kind: FailureKind,
        /// User-facing message.
        message: String,
    },
    /// The configured API URL is not a valid absolute URL.
    #[error("invalid API URL '{url}': {source}")]
    InvalidBaseUrl {
        /// Rejected input.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    ClientBuild {
        /// Builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    pub(crate) fn request_failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status behind a protocol failure, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed {
                kind: FailureKind::Protocol { status },
                ..
            } => Some(*status),
            _ => None,
        }
    }

    /// Failure kind for request failures.
    #[must_use]
    pub const fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::RequestFailed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Errors raised while reading or writing persisted preferences.
#[derive(Debug, Error)]
pub enum PreferencesError {
    /// The preferences file or its directory could not be written.
    #[error("failed to write preferences to '{path}'")]
    Write {
        /// Target path.
        path: PathBuf,
        /// IO error.
        #[source]
        source: std::io::Error,
    },
    /// The preference map could not be serialised.
    #[error("failed to serialize preferences")]
    Serialize {
        /// Serde error.
        #[source]
        source: serde_json::Error,
    },
}
