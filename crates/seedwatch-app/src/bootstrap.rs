//! Connection bootstrap: settings resolution, client construction and probe.
//!
//! # Design
//! - Command-line overrides win over stored settings for this run only.
//! - A user-supplied endpoint or backend is written back to the store, but
//!   only after the probe proved it reachable.
//! - The probe is one status call; for Transmission it also primes the
//!   session token.

use std::sync::Arc;

use seedwatch_backends::{BackendEntry, BackendOptions, lookup};
use seedwatch_config::{ConfigStore, Settings};
use seedwatch_core::TorrentBackend;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::poller::bounded;

/// Per-run overrides collected from flags and environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Backend name to use instead of the stored one.
    pub backend: Option<String>,
    /// Endpoint to use instead of the stored one.
    pub endpoint: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Poll interval in seconds.
    pub interval_secs: Option<u64>,
}

impl Overrides {
    const fn names_connection(&self) -> bool {
        self.backend.is_some() || self.endpoint.is_some()
    }
}

/// A connected backend and the settings in effect for this run.
pub struct Session {
    /// Registry entry the client was built from.
    pub entry: &'static BackendEntry,
    /// Connected client.
    pub backend: Arc<dyn TorrentBackend>,
    /// Effective settings, overrides applied.
    pub settings: Settings,
}

/// Merge stored settings with `overrides` and validate the result.
///
/// # Errors
///
/// Returns an error when the store cannot be read or the merged settings are invalid.
pub fn resolve_settings(store: &dyn ConfigStore, overrides: &Overrides) -> AppResult<Settings> {
    let mut settings = store
        .load()
        .map_err(|source| AppError::config("load settings", source))?;
    apply_connection(&mut settings, overrides);
    if let Some(timeout) = overrides.timeout_secs {
        settings.request_timeout_secs = timeout;
    }
    if let Some(interval) = overrides.interval_secs {
        settings.poll_interval_secs = interval;
    }
    settings
        .validate()
        .map_err(|source| AppError::config("validate settings", source))?;
    Ok(settings)
}

/// Resolve settings, build the client and probe it.
///
/// # Errors
///
/// Returns an error when the backend is unknown, the client cannot be built,
/// the probe fails, or a supplied endpoint cannot be persisted.
pub async fn connect(store: &dyn ConfigStore, overrides: &Overrides) -> AppResult<Session> {
    let settings = resolve_settings(store, overrides)?;
    let entry = lookup(&settings.backend).ok_or_else(|| AppError::UnknownBackend {
        name: settings.backend.clone(),
    })?;
    let options = BackendOptions {
        endpoint: settings.endpoint.clone(),
        username: settings.username.clone(),
        password: settings.password.clone(),
        timeout: settings.request_timeout(),
    };
    let endpoint = options.endpoint_or(entry.default_endpoint).to_string();
    let backend = entry
        .connect(&options)
        .map_err(|source| AppError::backend("construct", source))?;

    let status = bounded("probe", settings.request_timeout(), backend.status())
        .await
        .map_err(|source| AppError::backend("probe", source))?;
    info!(
        backend = entry.name,
        endpoint = %endpoint,
        download_rate = status.global_download_rate,
        upload_rate = status.global_upload_rate,
        "connected"
    );

    if overrides.names_connection() {
        remember_connection(store, overrides)?;
    }
    Ok(Session {
        entry,
        backend,
        settings,
    })
}

fn apply_connection(settings: &mut Settings, overrides: &Overrides) {
    match (&overrides.endpoint, &overrides.backend) {
        (Some(endpoint), backend) => settings.remember_endpoint(endpoint, backend.as_deref()),
        (None, Some(backend)) => settings.backend = backend.trim().to_ascii_lowercase(),
        (None, None) => {}
    }
}

fn remember_connection(store: &dyn ConfigStore, overrides: &Overrides) -> AppResult<()> {
    let mut stored = store
        .load()
        .map_err(|source| AppError::config("load settings", source))?;
    let before = stored.clone();
    apply_connection(&mut stored, overrides);
    if stored == before {
        return Ok(());
    }
    store
        .save(&stored)
        .map_err(|source| AppError::config("save settings", source))?;
    debug!(backend = %stored.backend, "connection settings remembered");
    Ok(())
}
