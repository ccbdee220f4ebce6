//! # Design
//!
//! - Centralize application-level errors for bootstrap, polling and control actions.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use seedwatch_core::{BackendError, DisplayError};
use thiserror::Error;
use tokio::task::JoinError;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Failures of the poll loop that are reported to its owner instead of
/// ending the loop silently.
#[derive(Debug, Error)]
pub enum PollError {
    /// The initial fetch could not be completed.
    #[error("initial poll failed")]
    Startup {
        /// Backend operation that failed.
        operation: &'static str,
        /// Source backend error.
        source: BackendError,
    },
    /// The display rejected the initial population.
    #[error("display unavailable during initial poll")]
    Display {
        /// Surface operation that failed.
        operation: &'static str,
        /// Source display error.
        source: DisplayError,
    },
    /// The background task ended without producing an outcome.
    #[error("poll task aborted")]
    Task {
        /// Source join error.
        source: JoinError,
    },
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Settings could not be loaded, validated or saved.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: seedwatch_config::ConfigError,
    },
    /// Logging could not be initialised.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: seedwatch_telemetry::TelemetryError,
    },
    /// No registered backend carries the requested name.
    #[error("unknown backend")]
    UnknownBackend {
        /// Name that was requested.
        name: String,
    },
    /// A backend call failed.
    #[error("backend operation failed")]
    Backend {
        /// Operation identifier.
        operation: &'static str,
        /// Source backend error.
        source: BackendError,
    },
    /// The display surface rejected an update.
    #[error("display operation failed")]
    Display {
        /// Operation identifier.
        operation: &'static str,
        /// Source display error.
        source: DisplayError,
    },
    /// The poll loop failed to start or finish.
    #[error("poll loop failed")]
    Poll {
        /// Source poll error.
        source: PollError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: seedwatch_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: seedwatch_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn backend(operation: &'static str, source: BackendError) -> Self {
        Self::Backend { operation, source }
    }

    pub(crate) const fn display(operation: &'static str, source: DisplayError) -> Self {
        Self::Display { operation, source }
    }

    /// Whether the error came from user input rather than a failing collaborator.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownBackend { .. }
                | Self::Config {
                    source: seedwatch_config::ConfigError::InvalidField { .. },
                    ..
                }
        )
    }
}

impl From<PollError> for AppError {
    fn from(source: PollError) -> Self {
        Self::Poll { source }
    }
}
