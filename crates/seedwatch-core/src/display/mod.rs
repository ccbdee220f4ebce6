//! Contract for the list widget the synchronisation layer pushes state into.
//!
//! The surface owns its rendered rows. Callers read the current items, decide
//! on a patch and write it back through these methods while holding whatever
//! lock guards the surface; no method performs network IO.

mod list_model;

pub use list_model::{ListModel, ListRow, RateLabels};

use crate::error::DisplayResult;
use crate::model::DisplayItem;

/// Ordered list of torrent rows plus the auxiliary controls around it.
pub trait DisplaySurface: Send {
    /// Snapshot of the displayed items in display order.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface can no longer be read.
    fn current_items(&self) -> DisplayResult<Vec<DisplayItem>>;

    /// Replace the whole list. Positions are reassigned to match the new order.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface can no longer be written.
    fn set_items(&mut self, items: Vec<DisplayItem>) -> DisplayResult<()>;

    /// Item at `position`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface can no longer be read.
    fn item(&self, position: usize) -> DisplayResult<Option<DisplayItem>>;

    /// Refresh the record held at `item.position` without rebuilding the list.
    ///
    /// # Errors
    ///
    /// Returns an error when the position is out of range or held by another id.
    fn update_item(&mut self, item: &DisplayItem) -> DisplayResult<()>;

    /// Item currently holding the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface can no longer be read.
    fn focused_item(&self) -> DisplayResult<Option<DisplayItem>>;

    /// Move the cursor to the item sharing `item`'s identity.
    ///
    /// # Errors
    ///
    /// Returns an error when no displayed item carries that identity.
    fn set_focused_item(&mut self, item: &DisplayItem) -> DisplayResult<()>;

    /// Set the primary label of a row.
    ///
    /// # Errors
    ///
    /// Returns an error when the position is out of range.
    fn set_label(&mut self, position: usize, label: &str) -> DisplayResult<()>;

    /// Set the first detail line of a row.
    ///
    /// # Errors
    ///
    /// Returns an error when the position is out of range.
    fn set_description(&mut self, position: usize, description: &str) -> DisplayResult<()>;

    /// Set the second detail line of a row.
    ///
    /// # Errors
    ///
    /// Returns an error when the position is out of range.
    fn set_tagline(&mut self, position: usize, tagline: &str) -> DisplayResult<()>;

    /// Attach a keyed property to a row.
    ///
    /// # Errors
    ///
    /// Returns an error when the position is out of range.
    fn set_property(&mut self, position: usize, key: &str, value: &str) -> DisplayResult<()>;

    /// Read back a keyed property of a row.
    ///
    /// # Errors
    ///
    /// Returns an error when the position is out of range.
    fn property(&self, position: usize, key: &str) -> DisplayResult<Option<String>>;

    /// Update the formatted global download/upload rate labels.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface can no longer be written.
    fn set_transfer_rates(&mut self, download: &str, upload: &str) -> DisplayResult<()>;

    /// Show or hide the global rate labels.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface can no longer be written.
    fn set_rates_visible(&mut self, visible: bool) -> DisplayResult<()>;

    /// Show or hide the busy indicator; cleared once a refresh has been applied.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface can no longer be written.
    fn set_busy(&mut self, busy: bool) -> DisplayResult<()>;

    /// Update the label naming the active sort order.
    ///
    /// # Errors
    ///
    /// Returns an error when the surface can no longer be written.
    fn set_sort_label(&mut self, label: &str) -> DisplayResult<()>;
}
