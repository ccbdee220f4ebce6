//! Row text and properties derived from a torrent record.
//!
//! # Design
//! - Presentation is the only place display granularity is introduced; the
//!   canonical percentage stays precise and the progress bucket is derived here.
//! - Texts depend on the transfer state so each row shows what matters for it:
//!   progress while downloading, share ratio while seeding.

use crate::display::DisplaySurface;
use crate::error::DisplayResult;
use crate::format::{format_duration, format_percent, format_size};
use crate::model::{DisplayItem, TorrentRecord, TransferStatus};

/// Property holding the transfer status name.
pub const PROPERTY_STATUS: &str = "transfer_status";
/// Property holding the torrent id.
pub const PROPERTY_ID: &str = "id";
/// Property holding the progress bucket (0, 10, ..., 100).
pub const PROPERTY_PROGRESS: &str = "progress_bar";

/// Everything written to the surface for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPresentation {
    /// Primary label.
    pub label: String,
    /// First detail line.
    pub description: String,
    /// Second detail line.
    pub tagline: String,
    /// Progress rounded to the nearest multiple of ten.
    pub progress: u8,
}

/// Build the row texts for a record.
#[must_use]
pub fn present(record: &TorrentRecord) -> RowPresentation {
    let (description, tagline) = match record.status {
        TransferStatus::Downloading => (
            with_eta(progress_line(record), record.estimated_time),
            format!(
                "Downloading from {} of {} peers - DL:{}/s UL:{}/s",
                record.peers_incoming,
                record.peers_connected,
                format_size(record.rate_download),
                format_size(record.rate_upload),
            ),
        ),
        TransferStatus::Seeding => (
            share_line(record),
            format!(
                "Seeding to {} of {} peers - UL:{}/s",
                record.peers_outgoing,
                record.peers_connected,
                format_size(record.rate_upload),
            ),
        ),
        TransferStatus::Paused => {
            let description = if record.is_complete() {
                share_line(record)
            } else {
                progress_line(record)
            };
            (description, "Paused".to_string())
        }
        TransferStatus::Unknown => (String::new(), String::new()),
    };
    RowPresentation {
        label: record.label.clone(),
        description,
        tagline,
        progress: progress_bucket(record.percent_done),
    }
}

/// Round a percentage to the nearest multiple of ten, clamped to 0-100.
#[must_use]
pub fn progress_bucket(percent: f64) -> u8 {
    if !percent.is_finite() {
        return 0;
    }
    let bucket = ((percent / 10.0).round() * 10.0).clamp(0.0, 100.0);
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "bucket is clamped to 0-100"
    )]
    {
        bucket as u8
    }
}

/// Write one item's texts and properties to the surface at its position.
///
/// # Errors
///
/// Returns an error when the surface rejects a write.
pub fn render_item<S>(surface: &mut S, item: &DisplayItem) -> DisplayResult<()>
where
    S: DisplaySurface + ?Sized,
{
    let row = present(&item.record);
    let position = item.position;
    surface.set_label(position, &row.label)?;
    surface.set_description(position, &row.description)?;
    surface.set_tagline(position, &row.tagline)?;
    surface.set_property(position, PROPERTY_STATUS, item.record.status.as_str())?;
    surface.set_property(position, PROPERTY_ID, &item.id)?;
    surface.set_property(position, PROPERTY_PROGRESS, &row.progress.to_string())
}

/// Render every item in order.
///
/// # Errors
///
/// Returns the first error reported by the surface.
pub fn render_items<S>(surface: &mut S, items: &[DisplayItem]) -> DisplayResult<()>
where
    S: DisplaySurface + ?Sized,
{
    items.iter().try_for_each(|item| render_item(surface, item))
}

fn progress_line(record: &TorrentRecord) -> String {
    format!(
        "{} of {} ({})",
        format_size(record.size_downloaded),
        format_size(record.size_total),
        format_percent(record.percent_done),
    )
}

fn share_line(record: &TorrentRecord) -> String {
    format!(
        "{}, uploaded {} (Ratio {:.2})",
        format_size(record.size_total),
        format_size(record.size_uploaded),
        record.ratio,
    )
}

fn with_eta(line: String, eta: Option<u64>) -> String {
    let remaining = eta.map(format_duration).unwrap_or_default();
    if remaining.is_empty() {
        line
    } else {
        format!("{line} - {remaining}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ListModel;

    const MIB: u64 = 1024 * 1024;

    fn downloading() -> TorrentRecord {
        TorrentRecord {
            status: TransferStatus::Downloading,
            size_total: 200 * MIB,
            size_downloaded: 50 * MIB,
            percent_done: 25.0,
            estimated_time: Some(3 * 3600 + 5 * 60),
            peers_connected: 12,
            peers_incoming: 4,
            rate_download: 1024,
            rate_upload: 512,
            ..TorrentRecord::new("1", "debian.iso")
        }
    }

    #[test]
    fn downloading_row_shows_progress_and_peers() {
        let row = present(&downloading());
        assert_eq!(row.description, "50 MB of 200 MB (25%) - 3 hr 5 min");
        assert_eq!(
            row.tagline,
            "Downloading from 4 of 12 peers - DL:1 KB/s UL:512 b/s"
        );
        assert_eq!(row.progress, 30);
    }

    #[test]
    fn downloading_row_without_eta_omits_suffix() {
        let record = TorrentRecord {
            estimated_time: None,
            ..downloading()
        };
        assert_eq!(present(&record).description, "50 MB of 200 MB (25%)");
    }

    #[test]
    fn seeding_and_paused_rows() {
        let seeding = TorrentRecord {
            status: TransferStatus::Seeding,
            size_total: 2 * MIB,
            size_uploaded: 3 * MIB,
            percent_done: 100.0,
            ratio: 1.5,
            peers_connected: 3,
            peers_outgoing: 2,
            rate_upload: 2048,
            ..TorrentRecord::new("2", "arch.iso")
        };
        let row = present(&seeding);
        assert_eq!(row.description, "2 MB, uploaded 3 MB (Ratio 1.50)");
        assert_eq!(row.tagline, "Seeding to 2 of 3 peers - UL:2 KB/s");

        let paused_complete = TorrentRecord {
            status: TransferStatus::Paused,
            ..seeding
        };
        let row = present(&paused_complete);
        assert_eq!(row.description, "2 MB, uploaded 3 MB (Ratio 1.50)");
        assert_eq!(row.tagline, "Paused");

        let paused_partial = TorrentRecord {
            status: TransferStatus::Paused,
            ..downloading()
        };
        assert_eq!(present(&paused_partial).description, "50 MB of 200 MB (25%)");
    }

    #[test]
    fn unknown_row_is_blank() {
        let row = present(&TorrentRecord::new("9", "mystery"));
        assert_eq!(row.label, "mystery");
        assert!(row.description.is_empty());
        assert!(row.tagline.is_empty());
    }

    #[test]
    fn progress_bucket_rounds_to_tens() {
        assert_eq!(progress_bucket(0.0), 0);
        assert_eq!(progress_bucket(4.9), 0);
        assert_eq!(progress_bucket(5.0), 10);
        assert_eq!(progress_bucket(56.3), 60);
        assert_eq!(progress_bucket(100.0), 100);
        assert_eq!(progress_bucket(140.0), 100);
        assert_eq!(progress_bucket(f64::NAN), 0);
    }

    #[test]
    fn render_item_writes_texts_and_properties() -> anyhow::Result<()> {
        let mut model = ListModel::new();
        let item = DisplayItem::new(0, downloading());
        model.set_items(vec![item.clone()])?;
        render_item(&mut model, &item)?;

        let row = &model.rows()[0];
        assert_eq!(row.label, "debian.iso");
        assert_eq!(row.tagline, "Downloading from 4 of 12 peers - DL:1 KB/s UL:512 b/s");
        assert_eq!(model.property(0, PROPERTY_STATUS)?.as_deref(), Some("Downloading"));
        assert_eq!(model.property(0, PROPERTY_ID)?.as_deref(), Some("1"));
        assert_eq!(model.property(0, PROPERTY_PROGRESS)?.as_deref(), Some("30"));
        Ok(())
    }

    #[test]
    fn render_items_stops_at_first_failure() {
        let mut model = ListModel::new();
        let stray = DisplayItem::new(4, downloading());
        assert!(render_items(&mut model, &[stray]).is_err());
    }
}
