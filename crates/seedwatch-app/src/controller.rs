//! User-triggered actions running beside the poll loop.
//!
//! # Design
//! - Sorting is a read-sort-write section under the same surface lock the
//!   poll loop uses; the chosen order is persisted after the lock is released.
//! - Backend actions never take the surface lock. Their effect shows up on the
//!   next poll tick.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use seedwatch_config::ConfigStore;
use seedwatch_core::{DisplayResult, DisplaySurface, SortKey, TorrentBackend, render_items, sort_items};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::poller::{bounded, lock_surface};

/// Reorder the displayed items and label the surface with the key.
///
/// Returns the number of items left on display.
pub(crate) fn apply_sort<S>(surface: &mut S, key: SortKey) -> DisplayResult<usize>
where
    S: DisplaySurface + ?Sized,
{
    let sorted = sort_items(surface.current_items()?, key);
    let count = sorted.len();
    surface.set_items(sorted.clone())?;
    render_items(surface, &sorted)?;
    surface.set_sort_label(&key.label())?;
    Ok(count)
}

/// Control path for one connected backend and its display.
pub struct Controller<S> {
    backend: Arc<dyn TorrentBackend>,
    surface: Arc<Mutex<S>>,
    config: Arc<dyn ConfigStore>,
    request_timeout: Duration,
}

impl<S> Controller<S>
where
    S: DisplaySurface,
{
    /// Bind the control path to its collaborators.
    #[must_use]
    pub fn new(
        backend: Arc<dyn TorrentBackend>,
        surface: Arc<Mutex<S>>,
        config: Arc<dyn ConfigStore>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            surface,
            config,
            request_timeout,
        }
    }

    /// Sort the displayed list and remember the order for the next start.
    ///
    /// Returns the number of items left on display.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface is unavailable or the order cannot be persisted.
    pub fn sort(&self, key: SortKey) -> AppResult<usize> {
        let count = {
            let mut surface = lock_surface(&self.surface, "sort")
                .map_err(|source| AppError::display("sort", source))?;
            apply_sort(&mut *surface, key).map_err(|source| AppError::display("sort", source))?
        };

        let mut settings = self
            .config
            .load()
            .map_err(|source| AppError::config("load settings", source))?;
        if settings.sort_order != key {
            settings.sort_order = key;
            self.config
                .save(&settings)
                .map_err(|source| AppError::config("save settings", source))?;
        }
        info!(key = %key, items = count, "list sorted");
        Ok(count)
    }

    /// Start one torrent, or every torrent when `id` is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the call or times out.
    pub async fn start(&self, id: Option<&str>) -> AppResult<()> {
        bounded("start", self.request_timeout, self.backend.start(id))
            .await
            .map_err(|source| AppError::backend("start", source))?;
        info!(backend = self.backend.name(), id = id.unwrap_or("all"), "start requested");
        Ok(())
    }

    /// Stop one torrent, or every torrent when `id` is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the call or times out.
    pub async fn stop(&self, id: Option<&str>) -> AppResult<()> {
        bounded("stop", self.request_timeout, self.backend.stop(id))
            .await
            .map_err(|source| AppError::backend("stop", source))?;
        info!(backend = self.backend.name(), id = id.unwrap_or("all"), "stop requested");
        Ok(())
    }

    /// Remove a torrent, optionally deleting its downloaded data.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the call or times out.
    pub async fn remove(&self, id: &str, delete_files: bool) -> AppResult<()> {
        bounded(
            "remove",
            self.request_timeout,
            self.backend.remove(id, delete_files),
        )
        .await
        .map_err(|source| AppError::backend("remove", source))?;
        info!(backend = self.backend.name(), id, delete_files, "remove requested");
        Ok(())
    }

    /// Hand a magnet link, URL or torrent file path to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the call or times out.
    pub async fn add(&self, source: &str, download_dir: Option<&str>) -> AppResult<()> {
        bounded(
            "add",
            self.request_timeout,
            self.backend.add(source, download_dir),
        )
        .await
        .map_err(|err| AppError::backend("add", err))?;
        info!(backend = self.backend.name(), source, "torrent added");
        Ok(())
    }
}
