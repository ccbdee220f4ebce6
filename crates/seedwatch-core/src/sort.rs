//! User-triggered reordering of the displayed list.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DisplayItem, TransferStatus};

/// Status groups in the order the status sort lays them out.
const STATUS_GROUPS: [TransferStatus; 3] = [
    TransferStatus::Downloading,
    TransferStatus::Seeding,
    TransferStatus::Paused,
];

/// Key the displayed list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Ordinal comparison of labels.
    #[default]
    Alphabetical,
    /// Grouped by transfer status.
    Status,
}

impl SortKey {
    /// Name used in configuration and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alphabetical => "alphabetical",
            Self::Status => "status",
        }
    }

    /// Caption shown next to the list while this order is active.
    #[must_use]
    pub fn label(self) -> String {
        self.as_str().to_uppercase()
    }
}

impl Display for SortKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Rejected sort key name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort key")]
pub struct UnknownSortKey {
    /// Name that failed to parse.
    pub value: String,
}

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "alphabetical" | "name" => Ok(Self::Alphabetical),
            "status" => Ok(Self::Status),
            _ => Err(UnknownSortKey {
                value: value.to_string(),
            }),
        }
    }
}

/// Reorder `items` by `key` and renumber their positions.
///
/// Alphabetical ordering is stable and compares labels byte-wise, so `"Zeta"`
/// sorts before `"alpha"`. Status ordering concatenates the downloading,
/// seeding and paused groups, keeping the incoming order inside each group;
/// items in any other state are left out of the result.
#[must_use]
pub fn sort_items(items: Vec<DisplayItem>, key: SortKey) -> Vec<DisplayItem> {
    let mut sorted = match key {
        SortKey::Alphabetical => {
            let mut items = items;
            items.sort_by(|left, right| left.record.label.cmp(&right.record.label));
            items
        }
        SortKey::Status => {
            let mut groups: [Vec<DisplayItem>; 3] = Default::default();
            for item in items {
                if let Some(slot) = STATUS_GROUPS
                    .iter()
                    .position(|status| *status == item.record.status)
                {
                    groups[slot].push(item);
                }
            }
            groups.into_iter().flatten().collect()
        }
    };
    for (position, item) in sorted.iter_mut().enumerate() {
        item.position = position;
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TorrentRecord;

    fn item(id: &str, label: &str, status: TransferStatus) -> DisplayItem {
        let record = TorrentRecord {
            status,
            ..TorrentRecord::new(id, label)
        };
        DisplayItem::new(0, record)
    }

    fn ids(items: &[DisplayItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn alphabetical_is_ordinal_and_stable() {
        let items = vec![
            item("1", "beta", TransferStatus::Paused),
            item("2", "Zeta", TransferStatus::Seeding),
            item("3", "alpha", TransferStatus::Downloading),
            item("4", "beta", TransferStatus::Downloading),
        ];
        let sorted = sort_items(items, SortKey::Alphabetical);
        assert_eq!(ids(&sorted), vec!["2", "3", "1", "4"]);
        let positions: Vec<usize> = sorted.iter().map(|item| item.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
    }

    #[test]
    fn status_groups_in_fixed_order_and_drops_unknown() {
        let items = vec![
            item("p1", "p1", TransferStatus::Paused),
            item("s1", "s1", TransferStatus::Seeding),
            item("u1", "u1", TransferStatus::Unknown),
            item("d1", "d1", TransferStatus::Downloading),
            item("s2", "s2", TransferStatus::Seeding),
            item("d2", "d2", TransferStatus::Downloading),
        ];
        let sorted = sort_items(items, SortKey::Status);
        assert_eq!(ids(&sorted), vec!["d1", "d2", "s1", "s2", "p1"]);
        assert_eq!(sorted[4].position, 4);
    }

    #[test]
    fn sort_key_parses_and_labels() -> anyhow::Result<()> {
        assert_eq!("status".parse::<SortKey>()?, SortKey::Status);
        assert_eq!(" Alphabetical ".parse::<SortKey>()?, SortKey::Alphabetical);
        assert!("size".parse::<SortKey>().is_err());
        assert_eq!(SortKey::Status.label(), "STATUS");
        assert_eq!(SortKey::default().to_string(), "alphabetical");
        assert_eq!(serde_json::to_string(&SortKey::Status)?, "\"status\"");
        Ok(())
    }
}
