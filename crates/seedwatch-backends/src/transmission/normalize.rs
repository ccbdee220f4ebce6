//! Mapping of `torrent-get` and `session-stats` payloads onto canonical records.
//!
//! Individual fields never fail the poll: anything missing, negative or of the
//! wrong type degrades to zero, and unknown status codes become `Unknown`.

use seedwatch_core::{StatusRecord, TorrentRecord, TransferStatus, percent_of};
use serde_json::Value;
use tracing::warn;

/// Classify a daemon status code.
///
/// Both the legacy bit-flag table (4/8/16) and the current sequential table
/// (0 stopped, 4 downloading, 6 seeding) are understood.
pub(crate) const fn classify(code: i64) -> TransferStatus {
    match code {
        4 => TransferStatus::Downloading,
        6 | 8 => TransferStatus::Seeding,
        0 | 16 => TransferStatus::Paused,
        _ => TransferStatus::Unknown,
    }
}

pub(crate) fn status(arguments: &Value) -> StatusRecord {
    StatusRecord {
        global_download_rate: count(arguments, "downloadSpeed"),
        global_upload_rate: count(arguments, "uploadSpeed"),
    }
}

/// Normalise one torrent; entries without a usable id are skipped.
pub(crate) fn torrent(raw: &Value) -> Option<TorrentRecord> {
    let Some(id) = identity(raw) else {
        warn!("skipping transmission torrent without an id");
        return None;
    };
    let label = raw
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let size_total = count(raw, "totalSize");
    let size_downloaded = completed_bytes(raw);

    Some(TorrentRecord {
        status: raw
            .get("status")
            .and_then(Value::as_i64)
            .map_or(TransferStatus::Unknown, classify),
        size_total,
        size_downloaded,
        size_uploaded: count(raw, "uploadedEver"),
        percent_done: percent(raw, size_downloaded, size_total),
        estimated_time: raw
            .get("eta")
            .and_then(Value::as_i64)
            .and_then(|eta| u64::try_from(eta).ok()),
        peers_connected: peers(raw, "peersConnected"),
        peers_incoming: peers(raw, "peersSendingToUs"),
        peers_outgoing: peers(raw, "peersGettingFromUs"),
        rate_download: count(raw, "rateDownload"),
        rate_upload: count(raw, "rateUpload"),
        ratio: non_negative(raw.get("uploadRatio").and_then(Value::as_f64)),
        ..TorrentRecord::new(id, label)
    })
}

fn identity(raw: &Value) -> Option<String> {
    match raw.get("id")? {
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// Reported fraction scaled to 0-100, or derived from byte counts when the
/// daemon leaves it out.
fn percent(raw: &Value, downloaded: u64, total: u64) -> f64 {
    raw.get("percentDone")
        .and_then(Value::as_f64)
        .map_or_else(
            || percent_of(downloaded, total),
            |fraction| (non_negative(Some(fraction)) * 100.0).min(100.0),
        )
}

fn completed_bytes(raw: &Value) -> u64 {
    raw.get("files")
        .and_then(Value::as_array)
        .map_or(0, |files| {
            files
                .iter()
                .map(|file| count(file, "bytesCompleted"))
                .fold(0_u64, u64::saturating_add)
        })
}

fn count(raw: &Value, key: &str) -> u64 {
    raw.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn peers(raw: &Value, key: &str) -> u32 {
    u32::try_from(count(raw, key)).unwrap_or(u32::MAX)
}

fn non_negative(value: Option<f64>) -> f64 {
    value
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_covers_both_code_tables() {
        assert_eq!(classify(4), TransferStatus::Downloading);
        assert_eq!(classify(8), TransferStatus::Seeding);
        assert_eq!(classify(6), TransferStatus::Seeding);
        assert_eq!(classify(16), TransferStatus::Paused);
        assert_eq!(classify(0), TransferStatus::Paused);
        assert_eq!(classify(2), TransferStatus::Unknown);
        assert_eq!(classify(-1), TransferStatus::Unknown);
    }

    #[test]
    fn malformed_fields_degrade_to_defaults() {
        let raw = json!({
            "id": "abcdef",
            "name": 12,
            "status": "weird",
            "totalSize": -5,
            "percentDone": "half",
            "eta": -1,
            "uploadRatio": -1.0,
            "files": "not-a-list",
            "peersConnected": 1.5
        });
        let record = torrent(&raw);
        assert!(record.is_some());
        let record = record.unwrap_or_default();
        assert_eq!(record.id, "abcdef");
        assert_eq!(record.label, "");
        assert_eq!(record.status, TransferStatus::Unknown);
        assert_eq!(record.size_total, 0);
        assert!(record.percent_done.abs() < f64::EPSILON);
        assert_eq!(record.estimated_time, None);
        assert!(record.ratio.abs() < f64::EPSILON);
        assert_eq!(record.size_downloaded, 0);
        assert_eq!(record.peers_connected, 0);
    }

    #[test]
    fn percent_is_clamped_and_files_are_summed() {
        let raw = json!({
            "id": 1,
            "percentDone": 1.000_000_2,
            "files": [{"bytesCompleted": 10}, {"bytesCompleted": 20}, {}]
        });
        let record = torrent(&raw).unwrap_or_default();
        assert!((record.percent_done - 100.0).abs() < f64::EPSILON);
        assert_eq!(record.size_downloaded, 30);
    }

    #[test]
    fn missing_percent_is_derived_from_bytes() {
        let raw = json!({
            "id": 1,
            "status": 4,
            "totalSize": 100,
            "files": [{"bytesCompleted": 50}]
        });
        let record = torrent(&raw).unwrap_or_default();
        assert_eq!(record.size_downloaded, 50);
        assert!((record.percent_done - 50.0).abs() < f64::EPSILON);

        let garbled = json!({
            "id": 2,
            "percentDone": "half",
            "totalSize": 4,
            "files": [{"bytesCompleted": 1}]
        });
        let record = torrent(&garbled).unwrap_or_default();
        assert!((record.percent_done - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_id_is_skipped() {
        assert!(torrent(&json!({"name": "orphan"})).is_none());
        assert!(torrent(&json!({"id": null})).is_none());
    }

    #[test]
    fn status_reads_session_speeds() {
        let record = status(&json!({"downloadSpeed": 100, "uploadSpeed": 7}));
        assert_eq!(record.global_download_rate, 100);
        assert_eq!(record.global_upload_rate, 7);
        assert_eq!(status(&json!({})), StatusRecord::default());
    }
}
