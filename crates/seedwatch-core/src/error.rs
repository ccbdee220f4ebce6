//! Error types for backend and display operations.
//!
//! # Design
//! - Backend failures carry the operation name so callers can log them
//!   without re-wrapping.
//! - [`FailureKind`] groups concrete errors into the coarse taxonomy the
//!   poll loop and connection bootstrap reason about.

use std::error::Error;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias for backend results.
pub type BackendResult<T> = Result<T, BackendError>;

/// Convenience alias for display surface results.
pub type DisplayResult<T> = Result<T, DisplayError>;

/// Coarse failure classes shared by every backend and display implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The daemon could not be reached (DNS, refused connection, timeout).
    ConnectionFailure,
    /// The daemon answered but the payload was unparseable or unexpected.
    ProtocolFailure,
    /// The daemon demanded a session token that could not be satisfied.
    AuthChallenge,
    /// The display surface is gone or unresponsive.
    DisplayUnavailable,
}

/// Failure raised by a backend client.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure reaching the daemon.
    #[error("could not reach backend during {operation}")]
    Connection {
        /// Operation identifier.
        operation: &'static str,
        /// Address the client was talking to.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The daemon did not answer within the configured bound.
    #[error("backend did not answer {operation} in time")]
    Timeout {
        /// Operation identifier.
        operation: &'static str,
        /// Bound that elapsed.
        after: Duration,
    },
    /// The daemon answered with something the client cannot interpret.
    #[error("backend protocol failure during {operation}: {detail}")]
    Protocol {
        /// Operation identifier.
        operation: &'static str,
        /// Human-readable description of what was wrong.
        detail: String,
    },
    /// The daemon kept demanding a session token after the single retry.
    #[error("backend session challenge not satisfied during {operation}")]
    AuthChallenge {
        /// Operation identifier.
        operation: &'static str,
    },
    /// The backend has no equivalent for the requested operation.
    #[error("backend does not support {operation}")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// The configured address cannot be used to reach a daemon.
    #[error("invalid backend endpoint: {detail}")]
    InvalidEndpoint {
        /// Address as supplied.
        endpoint: String,
        /// What is wrong with it.
        detail: String,
    },
}

impl BackendError {
    /// Build a connection failure from any transport error.
    pub fn connection(
        operation: &'static str,
        endpoint: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Connection {
            operation,
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }

    /// Build a protocol failure with a description of the offending payload.
    pub fn protocol(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Protocol {
            operation,
            detail: detail.into(),
        }
    }

    /// Build an endpoint error for an address that cannot be used.
    pub fn invalid_endpoint(endpoint: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            detail: detail.into(),
        }
    }

    /// Operation during which the failure occurred.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Connection { operation, .. }
            | Self::Timeout { operation, .. }
            | Self::Protocol { operation, .. }
            | Self::AuthChallenge { operation }
            | Self::Unsupported { operation } => operation,
            Self::InvalidEndpoint { .. } => "connect",
        }
    }

    /// Coarse classification of the failure.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } | Self::InvalidEndpoint { .. } => {
                FailureKind::ConnectionFailure
            }
            Self::Protocol { .. } | Self::Unsupported { .. } => FailureKind::ProtocolFailure,
            Self::AuthChallenge { .. } => FailureKind::AuthChallenge,
        }
    }
}

/// Failure raised by a display surface.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// The surface can no longer be written to.
    #[error("display surface unavailable during {operation}")]
    Unavailable {
        /// Operation identifier.
        operation: &'static str,
        /// Description of the underlying condition.
        detail: String,
    },
    /// A row position outside the current list was addressed.
    #[error("display position {position} out of range")]
    OutOfRange {
        /// Offending position.
        position: usize,
    },
    /// No displayed item carries the requested identity.
    #[error("display item not found")]
    MissingItem {
        /// Identity that was looked up.
        id: String,
    },
}

impl DisplayError {
    /// Build an unavailable error with a description of the underlying condition.
    pub fn unavailable(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            detail: detail.into(),
        }
    }

    /// Coarse classification of the failure.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        FailureKind::DisplayUnavailable
    }
}
