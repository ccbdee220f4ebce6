//! Mapping of `d.multicall2` rows onto canonical records.

use seedwatch_core::{TorrentRecord, TransferStatus, percent_of};
use tracing::warn;

use super::xmlrpc::XmlValue;

/// Per-torrent commands requested from `d.multicall2`, in row order.
pub(crate) const ROW_FIELDS: [&str; 12] = [
    "d.hash=",
    "d.name=",
    "d.state=",
    "d.complete=",
    "d.size_bytes=",
    "d.left_bytes=",
    "d.up.total=",
    "d.down.rate=",
    "d.up.rate=",
    "d.peers_connected=",
    "d.peers_complete=",
    "d.ratio=",
];

/// Normalise one row; rows with the wrong shape are skipped.
pub(crate) fn torrent(row: &XmlValue) -> Option<TorrentRecord> {
    let Some(fields) = row.as_array().filter(|fields| fields.len() >= ROW_FIELDS.len()) else {
        warn!("skipping rtorrent row with unexpected shape");
        return None;
    };
    let Some(hash) = fields[0].as_str().filter(|hash| !hash.is_empty()) else {
        warn!("skipping rtorrent row without a hash");
        return None;
    };
    let label = fields[1].as_str().unwrap_or_default();
    let number = |index: usize| fields[index].as_i64().and_then(|value| u64::try_from(value).ok()).unwrap_or(0);

    let started = number(2) != 0;
    let complete = number(3) != 0;
    let size = number(4);
    let left = number(5);
    let down_rate = number(7);
    let connected = clamp_u32(number(9));
    let seeders = clamp_u32(number(10));
    let downloaded = size.saturating_sub(left);

    Some(TorrentRecord {
        status: classify(started, complete),
        size_total: size,
        size_downloaded: downloaded,
        size_uploaded: number(6),
        percent_done: percent_of(downloaded, size),
        estimated_time: (down_rate > 0 && left > 0).then(|| left / down_rate),
        peers_connected: connected,
        peers_incoming: seeders,
        peers_outgoing: connected.saturating_sub(seeders),
        rate_download: down_rate,
        rate_upload: number(8),
        ratio: ratio(number(11)),
        ..TorrentRecord::new(hash, label)
    })
}

const fn classify(started: bool, complete: bool) -> TransferStatus {
    match (started, complete) {
        (false, _) => TransferStatus::Paused,
        (true, true) => TransferStatus::Seeding,
        (true, false) => TransferStatus::Downloading,
    }
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// rTorrent reports the share ratio multiplied by 1000.
fn ratio(raw: u64) -> f64 {
    f64::from(clamp_u32(raw)) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: [i64; 10]) -> XmlValue {
        let mut fields = vec![XmlValue::from("ABCDEF"), XmlValue::from("linux.iso")];
        fields.extend(values.into_iter().map(XmlValue::Int));
        XmlValue::Array(fields)
    }

    #[test]
    fn downloading_row() {
        let record = torrent(&row([1, 0, 1000, 250, 40, 25, 5, 8, 3, 40])).unwrap_or_default();
        assert_eq!(record.id, "ABCDEF");
        assert_eq!(record.label, "linux.iso");
        assert_eq!(record.status, TransferStatus::Downloading);
        assert_eq!(record.size_downloaded, 750);
        assert!((record.percent_done - 75.0).abs() < f64::EPSILON);
        assert_eq!(record.estimated_time, Some(10));
        assert_eq!(record.peers_incoming, 3);
        assert_eq!(record.peers_outgoing, 5);
        assert!((record.ratio - 0.04).abs() < f64::EPSILON);
    }

    #[test]
    fn status_classification() {
        assert_eq!(classify(false, true), TransferStatus::Paused);
        assert_eq!(classify(true, true), TransferStatus::Seeding);
        assert_eq!(classify(true, false), TransferStatus::Downloading);
        let seeding = torrent(&row([1, 1, 0, 0, 0, 0, 0, 0, 0, 0])).unwrap_or_default();
        assert_eq!(seeding.status, TransferStatus::Seeding);
        assert!(seeding.percent_done.abs() < f64::EPSILON);
        assert_eq!(seeding.estimated_time, None);
    }

    #[test]
    fn inconsistent_counts_saturate() {
        let record = torrent(&row([1, 0, 100, 500, -3, 0, 0, 2, 9, -1])).unwrap_or_default();
        assert_eq!(record.size_downloaded, 0);
        assert_eq!(record.size_uploaded, 0);
        assert_eq!(record.peers_outgoing, 0);
        assert!(record.ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        assert!(torrent(&XmlValue::from("nope")).is_none());
        assert!(torrent(&XmlValue::Array(vec![XmlValue::from("x")])).is_none());
        let mut fields = vec![XmlValue::Int(1), XmlValue::from("name")];
        fields.extend((0..10).map(XmlValue::Int));
        assert!(torrent(&XmlValue::Array(fields)).is_none());
    }
}
