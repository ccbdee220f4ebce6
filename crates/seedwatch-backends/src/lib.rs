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

//! Torrent daemon clients implementing [`seedwatch_core::TorrentBackend`].
//!
//! Layout: `registry.rs` (static name to constructor table), `transmission/`
//! (JSON-RPC over HTTP with session-token negotiation), `rtorrent/` (XML-RPC
//! over SCGI). Each client normalises its daemon's payloads before returning.

pub mod registry;
pub mod rtorrent;
pub mod transmission;

pub use registry::{BackendEntry, BackendOptions, REGISTRY, lookup, names};
pub use rtorrent::RtorrentClient;
pub use transmission::TransmissionClient;
