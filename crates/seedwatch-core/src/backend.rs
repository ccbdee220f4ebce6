//! Capability trait implemented by every torrent daemon client.

use async_trait::async_trait;

use crate::error::{BackendError, BackendResult};
use crate::model::{StatusRecord, TorrentRecord};

/// Client for one remote torrent daemon.
///
/// Implementations perform the network RPC and hand back normalised records;
/// raw daemon payloads never leave the implementing module. An absent id on
/// [`start`](Self::start) and [`stop`](Self::stop) applies the action to every
/// torrent the daemon knows about.
#[async_trait]
pub trait TorrentBackend: Send + Sync {
    /// Registry name of the backend (e.g. `transmission`).
    fn name(&self) -> &'static str;

    /// Fetch session-wide transfer rates.
    async fn status(&self) -> BackendResult<StatusRecord>;

    /// Fetch and normalise every torrent known to the daemon.
    async fn torrents(&self) -> BackendResult<Vec<TorrentRecord>>;

    /// Start one torrent, or all of them when `id` is `None`.
    async fn start(&self, id: Option<&str>) -> BackendResult<()>;

    /// Stop one torrent, or all of them when `id` is `None`.
    async fn stop(&self, id: Option<&str>) -> BackendResult<()>;

    /// Remove a torrent, optionally deleting its downloaded data.
    async fn remove(&self, id: &str, delete_files: bool) -> BackendResult<()>;

    /// Add a torrent from a URL, magnet link or daemon-local path; default
    /// implementation reports lack of support.
    async fn add(&self, source: &str, download_dir: Option<&str>) -> BackendResult<()> {
        let _ = (source, download_dir);
        Err(BackendError::Unsupported { operation: "add" })
    }
}
