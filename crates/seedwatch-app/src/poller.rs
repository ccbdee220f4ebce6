//! Background poll loop keeping a display surface in step with a backend.
//!
//! # Design
//! - `INIT` runs on the caller's task: one full fetch and population. Any
//!   failure is returned to the caller and the loop never starts.
//! - `RUNNING` is a spawned task that sleeps, fetches, reconciles and repeats.
//!   A single failed fetch ends the loop. It never retries or reconnects.
//! - The surface lock is taken for the read-reconcile-write section only and
//!   never across a backend call.
//! - Every backend call is bounded by the configured request timeout.
//! - The cancellation token is checked before each sleep, during the sleep and
//!   before each fetch.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use seedwatch_core::{
    BackendError, BackendResult, DisplayError, DisplayResult, DisplaySurface, Reconciliation,
    SortKey, StatusRecord, TorrentBackend, TorrentRecord, format_rate, populate, reconcile,
    render_item, render_items,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::apply_sort;
use crate::error::PollError;

/// Poll loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Initial population in progress.
    Init,
    /// Polling on the configured interval.
    Running,
    /// Terminal; no further polling happens.
    Stopped,
}

/// Why a running loop stopped.
#[derive(Debug)]
pub enum PollOutcome {
    /// The owner requested a stop.
    Cancelled,
    /// A backend call failed or timed out.
    BackendLost(BackendError),
    /// The display surface went away.
    DisplayLost(DisplayError),
}

/// Timing and startup options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay between ticks.
    pub interval: Duration,
    /// Upper bound on a single backend call.
    pub request_timeout: Duration,
    /// Order applied once after the initial population.
    pub initial_sort: Option<SortKey>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            initial_sort: None,
        }
    }
}

/// Owner's view of a running poll loop.
#[derive(Debug)]
pub struct PollerHandle {
    state: watch::Receiver<PollState>,
    cancel: CancellationToken,
    task: JoinHandle<PollOutcome>,
}

impl PollerHandle {
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    /// Ask the loop to stop at its next check.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loop to finish.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Task`] when the task panicked or was aborted.
    pub async fn join(self) -> Result<PollOutcome, PollError> {
        self.task.await.map_err(|source| PollError::Task { source })
    }
}

/// Poll loop bound to one backend and one surface.
pub struct Poller<S> {
    backend: Arc<dyn TorrentBackend>,
    surface: Arc<Mutex<S>>,
    config: PollerConfig,
    cancel: CancellationToken,
    state: watch::Sender<PollState>,
}

impl<S> Poller<S>
where
    S: DisplaySurface + 'static,
{
    /// Populate the surface once, then poll in the background.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Startup`] when the initial fetch fails and
    /// [`PollError::Display`] when the surface rejects the initial population.
    pub async fn start(
        backend: Arc<dyn TorrentBackend>,
        surface: Arc<Mutex<S>>,
        config: PollerConfig,
        cancel: CancellationToken,
    ) -> Result<PollerHandle, PollError> {
        let (state, receiver) = watch::channel(PollState::Init);
        let poller = Self {
            backend,
            surface,
            config,
            cancel,
            state,
        };

        if let Err(err) = poller.initialise().await {
            warn!(backend = poller.backend.name(), error = %err, "initial poll failed");
            poller.state.send_modify(|state| *state = PollState::Stopped);
            return Err(err);
        }

        poller.state.send_modify(|state| *state = PollState::Running);
        info!(
            backend = poller.backend.name(),
            interval_ms = duration_ms(poller.config.interval),
            "poll loop running"
        );
        let cancel = poller.cancel.clone();
        let task = tokio::spawn(poller.run());
        Ok(PollerHandle {
            state: receiver,
            cancel,
            task,
        })
    }

    async fn initialise(&self) -> Result<(), PollError> {
        let fresh = bounded(
            "torrents",
            self.config.request_timeout,
            self.backend.torrents(),
        )
        .await
        .map_err(|source| PollError::Startup {
            operation: "torrents",
            source,
        })?;
        let count = fresh.len();
        let initial_sort = self.config.initial_sort;
        self.with_surface("populate", |surface| {
            let items = populate(fresh);
            surface.set_items(items.clone())?;
            render_items(surface, &items)?;
            if let Some(key) = initial_sort {
                apply_sort(surface, key)?;
            }
            Ok(())
        })
        .map_err(|source| PollError::Display {
            operation: "populate",
            source,
        })?;

        let status = bounded("status", self.config.request_timeout, self.backend.status())
            .await
            .map_err(|source| PollError::Startup {
                operation: "status",
                source,
            })?;
        self.with_surface("rates", |surface| push_rates(surface, &status))
            .map_err(|source| PollError::Display {
                operation: "rates",
                source,
            })?;
        debug!(torrents = count, "initial population complete");
        Ok(())
    }

    async fn run(self) -> PollOutcome {
        let outcome = self.poll_until_stopped().await;
        match &outcome {
            PollOutcome::Cancelled => info!("poll loop cancelled"),
            PollOutcome::BackendLost(err) => {
                if let Err(display_err) =
                    self.with_surface("hide rates", |surface| surface.set_rates_visible(false))
                {
                    debug!(error = %display_err, "could not hide transfer rates");
                }
                warn!(
                    backend = self.backend.name(),
                    operation = err.operation(),
                    error = %err,
                    "backend lost; poll loop stopped"
                );
            }
            PollOutcome::DisplayLost(err) => {
                warn!(error = %err, "display surface lost; poll loop stopped");
            }
        }
        self.state.send_modify(|state| *state = PollState::Stopped);
        outcome
    }

    async fn poll_until_stopped(&self) -> PollOutcome {
        loop {
            if self.cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }
            tokio::select! {
                () = self.cancel.cancelled() => return PollOutcome::Cancelled,
                () = tokio::time::sleep(self.config.interval) => {}
            }
            if let Err(outcome) = self.tick().await {
                return outcome;
            }
        }
    }

    async fn tick(&self) -> Result<(), PollOutcome> {
        if self.cancel.is_cancelled() {
            return Err(PollOutcome::Cancelled);
        }
        let fresh = bounded(
            "torrents",
            self.config.request_timeout,
            self.backend.torrents(),
        )
        .await
        .map_err(PollOutcome::BackendLost)?;
        let patch = self
            .with_surface("reconcile", |surface| apply_poll(surface, fresh))
            .map_err(PollOutcome::DisplayLost)?;

        if self.cancel.is_cancelled() {
            return Err(PollOutcome::Cancelled);
        }
        let status = bounded("status", self.config.request_timeout, self.backend.status())
            .await
            .map_err(PollOutcome::BackendLost)?;
        self.with_surface("rates", |surface| push_rates(surface, &status))
            .map_err(PollOutcome::DisplayLost)?;

        debug!(
            torrents = patch.items.len(),
            added = patch.added,
            removed = patch.removed,
            structure_changed = patch.structure_changed,
            "poll tick applied"
        );
        Ok(())
    }

    fn with_surface<T>(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut S) -> DisplayResult<T>,
    ) -> DisplayResult<T> {
        let mut surface = lock_surface(&self.surface, operation)?;
        apply(&mut surface)
    }
}

/// Reconcile `fresh` against what the surface shows and write the patch back.
///
/// A membership change replaces the whole list and tries to put the cursor
/// back on the item it was on. Otherwise rows are refreshed where they stand.
fn apply_poll<S>(surface: &mut S, fresh: Vec<TorrentRecord>) -> DisplayResult<Reconciliation>
where
    S: DisplaySurface + ?Sized,
{
    let previous = surface.current_items()?;
    let patch = reconcile(previous, fresh);
    if patch.structure_changed {
        let focused = surface.focused_item().unwrap_or_else(|err| {
            debug!(error = %err, "could not capture focused item");
            None
        });
        surface.set_items(patch.items.clone())?;
        render_items(surface, &patch.items)?;
        if let Some(item) = focused
            && let Err(err) = surface.set_focused_item(&item)
        {
            debug!(id = %item.id, error = %err, "focus not restored after list rebuild");
        }
    } else {
        for item in &patch.items {
            surface.update_item(item)?;
            render_item(surface, item)?;
        }
    }
    Ok(patch)
}

fn push_rates<S>(surface: &mut S, status: &StatusRecord) -> DisplayResult<()>
where
    S: DisplaySurface + ?Sized,
{
    surface.set_transfer_rates(
        &format_rate(status.global_download_rate),
        &format_rate(status.global_upload_rate),
    )?;
    surface.set_rates_visible(true)?;
    surface.set_busy(false)
}

/// Lock a shared surface, reporting a poisoned lock as an unavailable display.
pub(crate) fn lock_surface<'a, S>(
    surface: &'a Mutex<S>,
    operation: &'static str,
) -> DisplayResult<MutexGuard<'a, S>> {
    surface
        .lock()
        .map_err(|_| DisplayError::unavailable(operation, "display lock poisoned"))
}

/// Run a backend call, failing with [`BackendError::Timeout`] after `limit`.
pub(crate) async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    call: impl Future<Output = BackendResult<T>>,
) -> BackendResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout {
            operation,
            after: limit,
        }),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedwatch_core::{ListModel, TransferStatus};

    fn record(id: &str, percent: f64) -> TorrentRecord {
        TorrentRecord {
            status: TransferStatus::Downloading,
            percent_done: percent,
            ..TorrentRecord::new(id, id)
        }
    }

    #[test]
    fn update_only_patch_keeps_list_and_focus() -> anyhow::Result<()> {
        let mut model = ListModel::new();
        apply_poll(&mut model, vec![record("a", 10.0), record("b", 20.0)])?;
        model.focus(1)?;

        let patch = apply_poll(&mut model, vec![record("a", 15.0), record("b", 25.0)])?;

        assert!(!patch.structure_changed);
        assert_eq!(model.replacements(), 1);
        assert_eq!(model.focused_position(), Some(1));
        assert!((model.rows()[1].item.record.percent_done - 25.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn structural_patch_restores_focus_by_identity() -> anyhow::Result<()> {
        let mut model = ListModel::new();
        apply_poll(&mut model, vec![record("a", 0.0), record("b", 0.0), record("c", 0.0)])?;
        model.focus(2)?;

        apply_poll(&mut model, vec![record("b", 0.0), record("c", 0.0)])?;

        assert_eq!(model.ids(), vec!["b", "c"]);
        assert_eq!(model.focused_position(), Some(1));
        assert_eq!(model.replacements(), 2);
        Ok(())
    }

    #[test]
    fn lost_focus_target_is_tolerated() -> anyhow::Result<()> {
        let mut model = ListModel::new();
        apply_poll(&mut model, vec![record("a", 0.0), record("b", 0.0)])?;
        model.focus(0)?;

        apply_poll(&mut model, vec![record("b", 0.0)])?;

        assert_eq!(model.focused_position(), None);
        Ok(())
    }

    #[tokio::test]
    async fn bounded_calls_time_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, BackendError>(())
        };
        let result = bounded("torrents", Duration::from_millis(10), slow).await;
        assert!(matches!(
            result,
            Err(BackendError::Timeout {
                operation: "torrents",
                ..
            })
        ));
    }

    #[test]
    fn poisoned_lock_reports_unavailable() {
        let surface = Arc::new(Mutex::new(ListModel::new()));
        let poisoner = Arc::clone(&surface);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the lock");
        })
        .join();
        assert!(matches!(
            lock_surface(&surface, "sort"),
            Err(DisplayError::Unavailable {
                operation: "sort",
                ..
            })
        ));
    }
}
