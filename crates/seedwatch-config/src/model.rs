//! Settings document persisted between runs.

use std::time::Duration;

use seedwatch_core::SortKey;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Backend used when none has been chosen.
pub const DEFAULT_BACKEND: &str = "transmission";
/// Seconds between poll ticks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Seconds a single backend request may take.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// User settings.
///
/// Missing keys fall back to their defaults so older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Registry name of the backend to connect to.
    pub backend: String,
    /// Last endpoint the user connected to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Order applied to the list at startup and by the last sort action.
    pub sort_order: SortKey,
    /// Seconds between poll ticks.
    pub poll_interval_secs: u64,
    /// Seconds a single backend request may take.
    pub request_timeout_secs: u64,
    /// Username for daemons behind HTTP authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password paired with `username`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            endpoint: None,
            sort_order: SortKey::default(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            username: None,
            password: None,
        }
    }
}

impl Settings {
    /// Check field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.backend.trim().is_empty() {
            return Err(invalid("backend", None, "must not be empty"));
        }
        if let Some(endpoint) = &self.endpoint
            && endpoint.trim().is_empty()
        {
            return Err(invalid("endpoint", Some(endpoint.clone()), "must not be blank"));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid(
                "poll_interval_secs",
                Some(self.poll_interval_secs.to_string()),
                "must be at least one second",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid(
                "request_timeout_secs",
                Some(self.request_timeout_secs.to_string()),
                "must be at least one second",
            ));
        }
        Ok(())
    }

    /// Delay between poll ticks.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Bound on a single backend request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Record a manually supplied endpoint, optionally switching backend.
    pub fn remember_endpoint(&mut self, endpoint: &str, backend: Option<&str>) {
        self.endpoint = Some(endpoint.trim().to_string());
        if let Some(backend) = backend {
            self.backend = backend.trim().to_ascii_lowercase();
        }
    }
}

const fn invalid(field: &'static str, value: Option<String>, reason: &'static str) -> ConfigError {
    ConfigError::InvalidField {
        field,
        value,
        reason,
    }
}
