//! Static table mapping backend names to their constructors.

use std::sync::Arc;
use std::time::Duration;

use seedwatch_core::{BackendResult, TorrentBackend};

use crate::rtorrent::RtorrentClient;
use crate::transmission::TransmissionClient;

/// Constructs a backend client from connection options.
pub type BackendConstructor = fn(&BackendOptions) -> BackendResult<Arc<dyn TorrentBackend>>;

/// Connection options shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOptions {
    /// Daemon address; the entry's default endpoint is used when absent.
    pub endpoint: Option<String>,
    /// Optional username for daemons behind authentication.
    pub username: Option<String>,
    /// Optional password paired with `username`.
    pub password: Option<String>,
    /// Transport timeout applied to every request.
    pub timeout: Duration,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            username: None,
            password: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl BackendOptions {
    /// Endpoint to connect to, falling back to `default_endpoint`.
    #[must_use]
    pub fn endpoint_or<'a>(&'a self, default_endpoint: &'a str) -> &'a str {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .unwrap_or(default_endpoint)
    }
}

/// One registered backend.
#[derive(Debug, Clone, Copy)]
pub struct BackendEntry {
    /// Name used in configuration and on the command line.
    pub name: &'static str,
    /// Address used when none is configured.
    pub default_endpoint: &'static str,
    /// One-line description for listings.
    pub description: &'static str,
    /// Constructor for the client.
    pub construct: BackendConstructor,
}

impl BackendEntry {
    /// Build a client for this backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint cannot be used.
    pub fn connect(&self, options: &BackendOptions) -> BackendResult<Arc<dyn TorrentBackend>> {
        (self.construct)(options)
    }
}

/// Every backend known to this build.
pub static REGISTRY: [BackendEntry; 2] = [
    BackendEntry {
        name: TransmissionClient::NAME,
        default_endpoint: TransmissionClient::DEFAULT_ENDPOINT,
        description: "Transmission daemon over JSON-RPC/HTTP",
        construct: construct_transmission,
    },
    BackendEntry {
        name: RtorrentClient::NAME,
        default_endpoint: RtorrentClient::DEFAULT_ENDPOINT,
        description: "rTorrent over XML-RPC/SCGI",
        construct: construct_rtorrent,
    },
];

/// Find a backend by name, ignoring ASCII case.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static BackendEntry> {
    let name = name.trim();
    REGISTRY
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name))
}

/// Registered backend names in registration order.
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|entry| entry.name)
}

fn construct_transmission(options: &BackendOptions) -> BackendResult<Arc<dyn TorrentBackend>> {
    Ok(Arc::new(TransmissionClient::new(options)?))
}

fn construct_rtorrent(options: &BackendOptions) -> BackendResult<Arc<dyn TorrentBackend>> {
    Ok(Arc::new(RtorrentClient::new(options)?))
}
