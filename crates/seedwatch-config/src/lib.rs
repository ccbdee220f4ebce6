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

//! File-backed settings for seedwatch.
//!
//! Layout: `model.rs` (settings document and validation), `store.rs`
//! (`ConfigStore` trait with file and in-memory implementations), `error.rs`.

pub mod error;
pub mod model;
pub mod store;

pub use error::{ConfigError, ConfigResult};
pub use model::Settings;
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};
