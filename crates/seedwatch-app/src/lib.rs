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
#![allow(clippy::redundant_pub_crate)]

//! Seedwatch application wiring: the poll loop, the control path and the CLI.
//!
//! Layout:
//! - `poller.rs`: INIT/RUNNING/STOPPED loop reconciling a surface with a backend
//! - `controller.rs`: sort and start/stop/remove/add actions
//! - `bootstrap.rs`: settings resolution, client construction and probe
//! - `console.rs`: terminal display surface
//! - `cli.rs`: argument parsing and command dispatch
//! - `main.rs`: thin entrypoint delegating to `run()`

/// Connection bootstrap.
pub mod bootstrap;
pub(crate) mod cli;
/// Terminal display surface.
pub mod console;
/// User-triggered actions.
pub mod controller;
/// Application error types.
pub mod error;
/// Background poll loop.
pub mod poller;

pub use bootstrap::{Overrides, Session, connect, resolve_settings};
pub use cli::run;
pub use console::ConsoleSurface;
pub use controller::Controller;
pub use error::{AppError, AppResult, PollError};
pub use poller::{PollOutcome, PollState, Poller, PollerConfig, PollerHandle};
