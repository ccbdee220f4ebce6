#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Backend-agnostic torrent records and the synchronisation primitives that
//! keep a display list in step with a remote daemon.
//!
//! Layout: `model.rs` (canonical records), `error.rs` (failure taxonomy),
//! `backend.rs` (daemon capability trait), `display/` (surface contract and
//! in-memory list model), `format.rs` (human-readable sizes and durations),
//! `reconcile.rs` (diff-and-patch over the displayed list), `sort.rs`
//! (user-triggered reordering), `present.rs` (row text and properties).

pub mod backend;
pub mod display;
pub mod error;
pub mod format;
pub mod model;
pub mod present;
pub mod reconcile;
pub mod sort;

pub use backend::TorrentBackend;
pub use display::{DisplaySurface, ListModel, ListRow, RateLabels};
pub use error::{BackendError, BackendResult, DisplayError, DisplayResult, FailureKind};
pub use format::{
    format_duration, format_duration_plural, format_percent, format_rate, format_size,
    format_size_bare,
};
pub use model::{DisplayItem, StatusRecord, TorrentRecord, TransferStatus, percent_of};
pub use present::{RowPresentation, present, progress_bucket, render_item, render_items};
pub use reconcile::{Reconciliation, populate, reconcile};
pub use sort::{SortKey, sort_items};
