//! Diff-and-patch between the displayed list and a fresh poll result.
//!
//! # Design
//! - Items that survive a poll are updated in place and keep their position,
//!   so the common tick leaves the surface's cursor and scroll state alone.
//! - The list is only rebuilt when its membership changes: survivors keep
//!   their relative order and newly arrived torrents are appended in the
//!   order the backend reported them.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::{DisplayItem, TorrentRecord};

/// Result of reconciling one poll against the displayed list.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Items to display after the patch, in display order.
    pub items: Vec<DisplayItem>,
    /// Whether membership changed and the surface must be rebuilt.
    pub structure_changed: bool,
    /// Number of torrents that appeared in this poll.
    pub added: usize,
    /// Number of displayed torrents absent from this poll.
    pub removed: usize,
}

/// Patch `previous` with the records of the latest poll.
///
/// Every record whose id is already displayed overwrites that item's fields
/// without moving it. Unknown ids become new items; displayed ids missing from
/// `fresh` are dropped. When an id appears more than once, the first
/// occurrence wins.
#[must_use]
pub fn reconcile(mut previous: Vec<DisplayItem>, fresh: Vec<TorrentRecord>) -> Reconciliation {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(previous.len());
    for (position, item) in previous.iter().enumerate() {
        index.entry(item.id.clone()).or_insert(position);
    }

    let mut seen: HashSet<String> = HashSet::with_capacity(fresh.len());
    let mut arrived = Vec::new();
    for record in fresh {
        if !seen.insert(record.id.clone()) {
            debug!(id = %record.id, "ignoring duplicate torrent id in poll result");
            continue;
        }
        match index.get(&record.id) {
            Some(&position) => previous[position].apply(record),
            None => arrived.push(record),
        }
    }

    let survives = |position: usize, item: &DisplayItem| {
        seen.contains(&item.id) && index.get(&item.id) == Some(&position)
    };
    let removed = previous
        .iter()
        .enumerate()
        .filter(|(position, item)| !survives(*position, item))
        .count();
    let added = arrived.len();

    if removed == 0 && added == 0 {
        return Reconciliation {
            items: previous,
            structure_changed: false,
            added,
            removed,
        };
    }

    let mut items: Vec<DisplayItem> = previous
        .into_iter()
        .enumerate()
        .filter(|(position, item)| survives(*position, item))
        .map(|(_, item)| item)
        .collect();
    items.extend(arrived.into_iter().map(|record| DisplayItem::new(0, record)));
    for (position, item) in items.iter_mut().enumerate() {
        item.position = position;
    }

    Reconciliation {
        items,
        structure_changed: true,
        added,
        removed,
    }
}

/// Build display items for a list that has never been populated.
#[must_use]
pub fn populate(fresh: Vec<TorrentRecord>) -> Vec<DisplayItem> {
    reconcile(Vec::new(), fresh).items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransferStatus;

    fn record(id: &str, percent: f64) -> TorrentRecord {
        TorrentRecord {
            percent_done: percent,
            status: TransferStatus::Downloading,
            ..TorrentRecord::new(id, format!("torrent {id}"))
        }
    }

    fn displayed(records: &[TorrentRecord]) -> Vec<DisplayItem> {
        records
            .iter()
            .enumerate()
            .map(|(position, record)| DisplayItem::new(position, record.clone()))
            .collect()
    }

    fn ids(items: &[DisplayItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn identical_poll_is_not_structural() {
        let records = vec![record("a", 10.0), record("b", 20.0)];
        let previous = displayed(&records);
        let outcome = reconcile(previous.clone(), records);
        assert!(!outcome.structure_changed);
        assert_eq!(outcome.items, previous);
    }

    #[test]
    fn appended_torrent_goes_last() {
        let previous = displayed(&[record("a", 0.0), record("b", 0.0)]);
        let outcome = reconcile(
            previous,
            vec![record("a", 0.0), record("b", 0.0), record("c", 0.0)],
        );
        assert!(outcome.structure_changed);
        assert_eq!(ids(&outcome.items), vec!["a", "b", "c"]);
        assert_eq!(outcome.items[2].position, 2);
        assert_eq!((outcome.added, outcome.removed), (1, 0));
    }

    #[test]
    fn missing_torrent_is_dropped() {
        let previous = displayed(&[record("a", 0.0), record("b", 0.0), record("c", 0.0)]);
        let outcome = reconcile(previous, vec![record("a", 0.0), record("c", 0.0)]);
        assert!(outcome.structure_changed);
        assert_eq!(ids(&outcome.items), vec!["a", "c"]);
        assert_eq!(outcome.items[1].position, 1);
        assert_eq!((outcome.added, outcome.removed), (0, 1));
    }

    #[test]
    fn update_only_mutates_in_place() {
        let previous = displayed(&[record("a", 50.0), record("b", 0.0)]);
        let outcome = reconcile(previous, vec![record("a", 75.0), record("b", 0.0)]);
        assert!(!outcome.structure_changed);
        assert_eq!(ids(&outcome.items), vec!["a", "b"]);
        assert_eq!(outcome.items[0].position, 0);
        assert!((outcome.items[0].record.percent_done - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn survivors_keep_displayed_order_not_poll_order() {
        let previous = displayed(&[record("b", 0.0), record("a", 0.0)]);
        let outcome = reconcile(previous, vec![record("a", 5.0), record("c", 0.0), record("b", 9.0)]);
        assert!(outcome.structure_changed);
        assert_eq!(ids(&outcome.items), vec!["b", "a", "c"]);
        assert!((outcome.items[0].record.percent_done - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn swap_of_one_id_for_another_is_structural() {
        let previous = displayed(&[record("a", 0.0), record("b", 0.0)]);
        let outcome = reconcile(previous, vec![record("a", 0.0), record("c", 0.0)]);
        assert!(outcome.structure_changed);
        assert_eq!(ids(&outcome.items), vec!["a", "c"]);
        assert_eq!((outcome.added, outcome.removed), (1, 1));
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let outcome = reconcile(Vec::new(), vec![record("a", 1.0), record("a", 2.0)]);
        assert_eq!(ids(&outcome.items), vec!["a"]);
        assert!((outcome.items[0].record.percent_done - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_poll_clears_list() {
        let previous = displayed(&[record("a", 0.0)]);
        let outcome = reconcile(previous, Vec::new());
        assert!(outcome.structure_changed);
        assert!(outcome.items.is_empty());

        let untouched = reconcile(Vec::new(), Vec::new());
        assert!(!untouched.structure_changed);
    }

    #[test]
    fn populate_assigns_sequential_positions() {
        let items = populate(vec![record("x", 0.0), record("y", 0.0)]);
        let positions: Vec<usize> = items.iter().map(|item| item.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }
}
