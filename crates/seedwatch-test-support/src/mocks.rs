//! Fake collaborators for poll loop and controller tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use seedwatch_core::{
    BackendError, BackendResult, DisplayError, DisplayItem, DisplayResult, DisplaySurface,
    ListModel, StatusRecord, TorrentBackend, TorrentRecord,
};

/// Control action observed by a [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    /// `start` with its optional id.
    Start(Option<String>),
    /// `stop` with its optional id.
    Stop(Option<String>),
    /// `remove` with its arguments.
    Remove {
        /// Torrent id.
        id: String,
        /// Whether data deletion was requested.
        delete_files: bool,
    },
    /// `add` with its arguments.
    Add {
        /// Torrent source.
        source: String,
        /// Requested download directory.
        download_dir: Option<String>,
    },
}

#[derive(Debug, Default)]
struct Script {
    torrents: VecDeque<BackendResult<Vec<TorrentRecord>>>,
    current: Vec<TorrentRecord>,
    status: VecDeque<BackendResult<StatusRecord>>,
    steady_status: StatusRecord,
    action_failures: VecDeque<BackendError>,
    actions: Vec<RecordedAction>,
    delay: Option<Duration>,
}

/// Backend answering from queued responses.
///
/// Queued torrent lists are served in order; once the queue drains, the last
/// served list repeats. Status answers behave the same way against a steady
/// status record.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
    torrent_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl ScriptedBackend {
    /// Backend whose torrent list is `initial` until something else is queued.
    #[must_use]
    pub fn new(initial: Vec<TorrentRecord>) -> Self {
        let backend = Self::default();
        backend.script().current = initial;
        backend
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a torrent list for a later `torrents` call.
    pub fn push_torrents(&self, torrents: Vec<TorrentRecord>) {
        self.script().torrents.push_back(Ok(torrents));
    }

    /// Queue a failure for a later `torrents` call.
    pub fn push_torrents_error(&self, error: BackendError) {
        self.script().torrents.push_back(Err(error));
    }

    /// Queue a status answer.
    pub fn push_status(&self, status: StatusRecord) {
        self.script().status.push_back(Ok(status));
    }

    /// Queue a failure for a later `status` call.
    pub fn push_status_error(&self, error: BackendError) {
        self.script().status.push_back(Err(error));
    }

    /// Status returned when nothing is queued.
    pub fn set_steady_status(&self, status: StatusRecord) {
        self.script().steady_status = status;
    }

    /// Fail the next control action with `error`.
    pub fn fail_next_action(&self, error: BackendError) {
        self.script().action_failures.push_back(error);
    }

    /// Delay every fetch by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.script().delay = Some(delay);
    }

    /// Number of `torrents` calls made so far.
    #[must_use]
    pub fn torrent_calls(&self) -> usize {
        self.torrent_calls.load(Ordering::SeqCst)
    }

    /// Number of `status` calls made so far.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Control actions received so far.
    #[must_use]
    pub fn actions(&self) -> Vec<RecordedAction> {
        self.script().actions.clone()
    }

    async fn pause(&self) {
        let delay = self.script().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, action: RecordedAction) -> BackendResult<()> {
        let mut script = self.script();
        script.actions.push(action);
        script.action_failures.pop_front().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl TorrentBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn status(&self) -> BackendResult<StatusRecord> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let mut script = self.script();
        let steady = script.steady_status;
        script.status.pop_front().unwrap_or(Ok(steady))
    }

    async fn torrents(&self) -> BackendResult<Vec<TorrentRecord>> {
        self.torrent_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let mut script = self.script();
        match script.torrents.pop_front() {
            Some(Ok(torrents)) => {
                script.current.clone_from(&torrents);
                Ok(torrents)
            }
            Some(Err(error)) => Err(error),
            None => Ok(script.current.clone()),
        }
    }

    async fn start(&self, id: Option<&str>) -> BackendResult<()> {
        self.record(RecordedAction::Start(id.map(str::to_string)))
    }

    async fn stop(&self, id: Option<&str>) -> BackendResult<()> {
        self.record(RecordedAction::Stop(id.map(str::to_string)))
    }

    async fn remove(&self, id: &str, delete_files: bool) -> BackendResult<()> {
        self.record(RecordedAction::Remove {
            id: id.to_string(),
            delete_files,
        })
    }

    async fn add(&self, source: &str, download_dir: Option<&str>) -> BackendResult<()> {
        self.record(RecordedAction::Add {
            source: source.to_string(),
            download_dir: download_dir.map(str::to_string),
        })
    }
}

/// List model that can be detached to simulate a display that went away.
#[derive(Debug, Clone)]
pub struct DetachableSurface {
    inner: ListModel,
    detached: bool,
}

impl Default for DetachableSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DetachableSurface {
    /// Attached surface over an empty list model.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: ListModel::new(),
            detached: false,
        }
    }

    /// Make every later call fail as unavailable.
    pub const fn detach(&mut self) {
        self.detached = true;
    }

    /// Underlying list model.
    #[must_use]
    pub const fn model(&self) -> &ListModel {
        &self.inner
    }

    /// Mutable access to the list model, e.g. to move the cursor.
    pub const fn model_mut(&mut self) -> &mut ListModel {
        &mut self.inner
    }

    fn attached(&self, operation: &'static str) -> DisplayResult<()> {
        if self.detached {
            Err(DisplayError::unavailable(operation, "surface detached"))
        } else {
            Ok(())
        }
    }
}

impl DisplaySurface for DetachableSurface {
    fn current_items(&self) -> DisplayResult<Vec<DisplayItem>> {
        self.attached("current_items")?;
        self.inner.current_items()
    }

    fn set_items(&mut self, items: Vec<DisplayItem>) -> DisplayResult<()> {
        self.attached("set_items")?;
        self.inner.set_items(items)
    }

    fn item(&self, position: usize) -> DisplayResult<Option<DisplayItem>> {
        self.attached("item")?;
        self.inner.item(position)
    }

    fn update_item(&mut self, item: &DisplayItem) -> DisplayResult<()> {
        self.attached("update_item")?;
        self.inner.update_item(item)
    }

    fn focused_item(&self) -> DisplayResult<Option<DisplayItem>> {
        self.attached("focused_item")?;
        self.inner.focused_item()
    }

    fn set_focused_item(&mut self, item: &DisplayItem) -> DisplayResult<()> {
        self.attached("set_focused_item")?;
        self.inner.set_focused_item(item)
    }

    fn set_label(&mut self, position: usize, label: &str) -> DisplayResult<()> {
        self.attached("set_label")?;
        self.inner.set_label(position, label)
    }

    fn set_description(&mut self, position: usize, description: &str) -> DisplayResult<()> {
        self.attached("set_description")?;
        self.inner.set_description(position, description)
    }

    fn set_tagline(&mut self, position: usize, tagline: &str) -> DisplayResult<()> {
        self.attached("set_tagline")?;
        self.inner.set_tagline(position, tagline)
    }

    fn set_property(&mut self, position: usize, key: &str, value: &str) -> DisplayResult<()> {
        self.attached("set_property")?;
        self.inner.set_property(position, key, value)
    }

    fn property(&self, position: usize, key: &str) -> DisplayResult<Option<String>> {
        self.attached("property")?;
        self.inner.property(position, key)
    }

    fn set_transfer_rates(&mut self, download: &str, upload: &str) -> DisplayResult<()> {
        self.attached("set_transfer_rates")?;
        self.inner.set_transfer_rates(download, upload)
    }

    fn set_rates_visible(&mut self, visible: bool) -> DisplayResult<()> {
        self.attached("set_rates_visible")?;
        self.inner.set_rates_visible(visible)
    }

    fn set_busy(&mut self, busy: bool) -> DisplayResult<()> {
        self.attached("set_busy")?;
        self.inner.set_busy(busy)
    }

    fn set_sort_label(&mut self, label: &str) -> DisplayResult<()> {
        self.attached("set_sort_label")?;
        self.inner.set_sort_label(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::RecordBuilder;

    #[tokio::test]
    async fn queued_lists_drain_then_repeat() -> anyhow::Result<()> {
        let backend = ScriptedBackend::new(vec![RecordBuilder::paused("a", "a").build()]);
        backend.push_torrents(vec![RecordBuilder::paused("b", "b").build()]);

        assert_eq!(backend.torrents().await?[0].id, "b");
        assert_eq!(backend.torrents().await?[0].id, "b");
        assert_eq!(backend.torrent_calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn initial_list_is_served_first() -> anyhow::Result<()> {
        let backend = ScriptedBackend::new(vec![RecordBuilder::paused("a", "a").build()]);
        assert_eq!(backend.torrents().await?[0].id, "a");
        Ok(())
    }

    #[tokio::test]
    async fn queued_failures_are_returned_once() -> anyhow::Result<()> {
        let backend = ScriptedBackend::default();
        backend.push_status_error(BackendError::protocol("status", "boom"));
        assert!(backend.status().await.is_err());
        assert_eq!(backend.status().await?, StatusRecord::default());

        backend.fail_next_action(BackendError::Unsupported { operation: "stop" });
        assert!(backend.stop(Some("x")).await.is_err());
        backend.stop(None).await?;
        assert_eq!(
            backend.actions(),
            vec![
                RecordedAction::Stop(Some("x".to_string())),
                RecordedAction::Stop(None)
            ]
        );
        Ok(())
    }

    #[test]
    fn detached_surface_reports_unavailable() -> anyhow::Result<()> {
        let mut surface = DetachableSurface::new();
        surface.set_items(Vec::new())?;
        surface.detach();
        assert!(matches!(
            surface.set_busy(false),
            Err(DisplayError::Unavailable { operation: "set_busy", .. })
        ));
        Ok(())
    }
}
