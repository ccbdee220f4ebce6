//! Builders for canonical torrent records.

use seedwatch_core::{TorrentRecord, TransferStatus, percent_of};

/// Fluent builder over [`TorrentRecord`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: TorrentRecord,
}

impl RecordBuilder {
    /// Start from an `Unknown` record with the given identity.
    #[must_use]
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            record: TorrentRecord::new(id, label),
        }
    }

    /// Downloading record at `percent` completion.
    #[must_use]
    pub fn downloading(id: &str, label: &str, percent: f64) -> Self {
        Self::new(id, label)
            .status(TransferStatus::Downloading)
            .percent(percent)
    }

    /// Complete, seeding record.
    #[must_use]
    pub fn seeding(id: &str, label: &str) -> Self {
        Self::new(id, label)
            .status(TransferStatus::Seeding)
            .percent(100.0)
    }

    /// Paused record.
    #[must_use]
    pub fn paused(id: &str, label: &str) -> Self {
        Self::new(id, label).status(TransferStatus::Paused)
    }

    /// Set the transfer status.
    #[must_use]
    pub const fn status(mut self, status: TransferStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Set the completion percentage.
    #[must_use]
    pub const fn percent(mut self, percent: f64) -> Self {
        self.record.percent_done = percent;
        self
    }

    /// Set total and downloaded sizes, deriving the percentage.
    #[must_use]
    pub fn sizes(mut self, total: u64, downloaded: u64) -> Self {
        self.record.size_total = total;
        self.record.size_downloaded = downloaded;
        self.record.percent_done = percent_of(downloaded, total);
        self
    }

    /// Set per-torrent transfer rates.
    #[must_use]
    pub const fn rates(mut self, download: u64, upload: u64) -> Self {
        self.record.rate_download = download;
        self.record.rate_upload = upload;
        self
    }

    /// Set the peer counters.
    #[must_use]
    pub const fn peers(mut self, connected: u32, incoming: u32, outgoing: u32) -> Self {
        self.record.peers_connected = connected;
        self.record.peers_incoming = incoming;
        self.record.peers_outgoing = outgoing;
        self
    }

    /// Finish the record.
    #[must_use]
    pub fn build(self) -> TorrentRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_derive_percent() {
        let record = RecordBuilder::downloading("1", "a", 0.0).sizes(200, 50).build();
        assert_eq!(record.status, TransferStatus::Downloading);
        assert!((record.percent_done - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn presets_set_status() {
        assert_eq!(RecordBuilder::seeding("2", "b").build().status, TransferStatus::Seeding);
        assert_eq!(RecordBuilder::paused("3", "c").build().status, TransferStatus::Paused);
        assert_eq!(RecordBuilder::new("4", "d").build().status, TransferStatus::Unknown);
    }
}
