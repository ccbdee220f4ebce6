//! Canonical torrent records shared by every backend and the display layer.
//!
//! # Design
//! - Backends normalise their payloads into [`TorrentRecord`] before anything
//!   else sees them; nothing downstream knows which daemon produced a record.
//! - [`DisplayItem`] pairs a record with its place in the displayed list and
//!   the identity used as the reconciliation key.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Coarse transfer state every backend status code is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Payload is still being fetched from peers.
    Downloading,
    /// Payload is complete and being served to peers.
    Seeding,
    /// Torrent is stopped by the user or the daemon.
    Paused,
    /// Daemon reported a state with no canonical equivalent.
    #[default]
    Unknown,
}

impl TransferStatus {
    /// Stable name used for display properties and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Downloading => "Downloading",
            Self::Seeding => "Seeding",
            Self::Paused => "Paused",
            Self::Unknown => "Unknown",
        }
    }
}

impl Display for TransferStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Normalised snapshot of one torrent as reported by a backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Identifier that stays stable for the lifetime of the torrent in a session.
    pub id: String,
    /// Display name.
    pub label: String,
    /// Canonical transfer state.
    pub status: TransferStatus,
    /// Total payload size in bytes.
    pub size_total: u64,
    /// Bytes verified on disk.
    pub size_downloaded: u64,
    /// Bytes uploaded over the torrent's lifetime.
    pub size_uploaded: u64,
    /// Completion percentage in the range 0-100.
    pub percent_done: f64,
    /// Seconds until completion when the daemon can estimate it.
    pub estimated_time: Option<u64>,
    /// Peers currently connected.
    pub peers_connected: u32,
    /// Connected peers sending data to us.
    pub peers_incoming: u32,
    /// Connected peers receiving data from us.
    pub peers_outgoing: u32,
    /// Download throughput in bytes per second.
    pub rate_download: u64,
    /// Upload throughput in bytes per second.
    pub rate_upload: u64,
    /// Upload/download share ratio.
    pub ratio: f64,
}

impl TorrentRecord {
    /// Construct an empty record carrying only identity and label.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    /// Whether the payload has been fully downloaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percent_done >= 100.0
    }
}

/// Aggregate transfer rates reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Session-wide download rate in bytes per second.
    pub global_download_rate: u64,
    /// Session-wide upload rate in bytes per second.
    pub global_upload_rate: u64,
}

/// A torrent record as placed in the displayed list.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayItem {
    /// Index of the item within the displayed sequence.
    pub position: usize,
    /// Reconciliation key; equal to the record id and never changed afterwards.
    pub id: String,
    /// Latest normalised state for the torrent.
    pub record: TorrentRecord,
}

impl DisplayItem {
    /// Wrap a freshly observed record at the given position.
    #[must_use]
    pub fn new(position: usize, record: TorrentRecord) -> Self {
        Self {
            position,
            id: record.id.clone(),
            record,
        }
    }

    /// Overwrite the mutable fields with a newer snapshot of the same torrent.
    ///
    /// Position and identity are left untouched.
    pub fn apply(&mut self, record: TorrentRecord) {
        debug_assert_eq!(self.id, record.id, "record applied to a different item");
        self.record = record;
    }
}

/// Completion percentage for `done` out of `total` bytes, `0` when `total` is zero.
#[must_use]
pub fn percent_of(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = (to_f64(done) / to_f64(total)) * 100.0;
    percent.min(100.0)
}

const fn to_f64(value: u64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "byte counts only feed a display percentage"
    )]
    {
        value as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_guards_zero_total() {
        assert!(percent_of(10, 0).abs() < f64::EPSILON);
        assert!((percent_of(5, 10) - 50.0).abs() < f64::EPSILON);
        assert!((percent_of(10, 10) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_of_caps_inconsistent_counts() {
        assert!((percent_of(12, 10) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn display_item_apply_keeps_position_and_identity() {
        let mut item = DisplayItem::new(3, TorrentRecord::new("7", "ubuntu.iso"));
        let mut newer = TorrentRecord::new("7", "ubuntu-24.04.iso");
        newer.percent_done = 42.0;
        item.apply(newer);
        assert_eq!(item.position, 3);
        assert_eq!(item.id, "7");
        assert_eq!(item.record.label, "ubuntu-24.04.iso");
        assert!((item.record.percent_done - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn transfer_status_names_are_stable() {
        assert_eq!(TransferStatus::Downloading.to_string(), "Downloading");
        assert_eq!(TransferStatus::default(), TransferStatus::Unknown);
    }
}
