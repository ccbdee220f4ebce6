use std::collections::BTreeMap;

use crate::display::DisplaySurface;
use crate::error::{DisplayError, DisplayResult};
use crate::model::DisplayItem;

/// One rendered row of a [`ListModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    /// Item backing the row.
    pub item: DisplayItem,
    /// Primary label.
    pub label: String,
    /// First detail line.
    pub description: String,
    /// Second detail line.
    pub tagline: String,
    /// Keyed properties attached by the presentation layer.
    pub properties: BTreeMap<String, String>,
}

impl ListRow {
    fn new(item: DisplayItem) -> Self {
        Self {
            label: item.record.label.clone(),
            item,
            description: String::new(),
            tagline: String::new(),
            properties: BTreeMap::new(),
        }
    }
}

/// Formatted global rate labels and their visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLabels {
    /// Formatted download rate.
    pub download: String,
    /// Formatted upload rate.
    pub upload: String,
    /// Whether the labels are shown.
    pub visible: bool,
}

/// In-memory display surface.
///
/// Used directly by headless hosts and tests, and wrapped by renderers that
/// draw the rows somewhere. Replacing the item list drops the cursor, the way
/// list widgets reset their focus when their model is swapped.
#[derive(Debug, Clone, Default)]
pub struct ListModel {
    rows: Vec<ListRow>,
    focused: Option<usize>,
    rates: RateLabels,
    busy: bool,
    sort_label: String,
    replacements: usize,
}

impl ListModel {
    /// Empty list with the busy indicator raised.
    #[must_use]
    pub fn new() -> Self {
        Self {
            busy: true,
            ..Self::default()
        }
    }

    /// Rendered rows in display order.
    #[must_use]
    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    /// Global rate labels.
    #[must_use]
    pub const fn rates(&self) -> &RateLabels {
        &self.rates
    }

    /// Whether the busy indicator is raised.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    /// Label naming the active sort order.
    #[must_use]
    pub fn sort_label(&self) -> &str {
        &self.sort_label
    }

    /// Position of the cursor, if any.
    #[must_use]
    pub const fn focused_position(&self) -> Option<usize> {
        self.focused
    }

    /// Number of times the whole list has been replaced.
    #[must_use]
    pub const fn replacements(&self) -> usize {
        self.replacements
    }

    /// Ids in display order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.item.id.clone()).collect()
    }

    /// Move the cursor to a position, as a user navigating the list would.
    ///
    /// # Errors
    ///
    /// Returns an error when the position is out of range.
    pub fn focus(&mut self, position: usize) -> DisplayResult<()> {
        self.row(position)?;
        self.focused = Some(position);
        Ok(())
    }

    fn row(&self, position: usize) -> DisplayResult<&ListRow> {
        self.rows
            .get(position)
            .ok_or(DisplayError::OutOfRange { position })
    }

    fn row_mut(&mut self, position: usize) -> DisplayResult<&mut ListRow> {
        self.rows
            .get_mut(position)
            .ok_or(DisplayError::OutOfRange { position })
    }
}

impl DisplaySurface for ListModel {
    fn current_items(&self) -> DisplayResult<Vec<DisplayItem>> {
        Ok(self.rows.iter().map(|row| row.item.clone()).collect())
    }

    fn set_items(&mut self, items: Vec<DisplayItem>) -> DisplayResult<()> {
        self.rows = items
            .into_iter()
            .enumerate()
            .map(|(position, mut item)| {
                item.position = position;
                ListRow::new(item)
            })
            .collect();
        self.focused = None;
        self.replacements += 1;
        Ok(())
    }

    fn item(&self, position: usize) -> DisplayResult<Option<DisplayItem>> {
        Ok(self.rows.get(position).map(|row| row.item.clone()))
    }

    fn update_item(&mut self, item: &DisplayItem) -> DisplayResult<()> {
        let row = self.row_mut(item.position)?;
        if row.item.id != item.id {
            return Err(DisplayError::MissingItem {
                id: item.id.clone(),
            });
        }
        row.item.record = item.record.clone();
        Ok(())
    }

    fn focused_item(&self) -> DisplayResult<Option<DisplayItem>> {
        Ok(self
            .focused
            .and_then(|position| self.rows.get(position))
            .map(|row| row.item.clone()))
    }

    fn set_focused_item(&mut self, item: &DisplayItem) -> DisplayResult<()> {
        let position = self
            .rows
            .iter()
            .position(|row| row.item.id == item.id)
            .ok_or_else(|| DisplayError::MissingItem {
                id: item.id.clone(),
            })?;
        self.focused = Some(position);
        Ok(())
    }

    fn set_label(&mut self, position: usize, label: &str) -> DisplayResult<()> {
        label.clone_into(&mut self.row_mut(position)?.label);
        Ok(())
    }

    fn set_description(&mut self, position: usize, description: &str) -> DisplayResult<()> {
        description.clone_into(&mut self.row_mut(position)?.description);
        Ok(())
    }

    fn set_tagline(&mut self, position: usize, tagline: &str) -> DisplayResult<()> {
        tagline.clone_into(&mut self.row_mut(position)?.tagline);
        Ok(())
    }

    fn set_property(&mut self, position: usize, key: &str, value: &str) -> DisplayResult<()> {
        self.row_mut(position)?
            .properties
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn property(&self, position: usize, key: &str) -> DisplayResult<Option<String>> {
        Ok(self.row(position)?.properties.get(key).cloned())
    }

    fn set_transfer_rates(&mut self, download: &str, upload: &str) -> DisplayResult<()> {
        download.clone_into(&mut self.rates.download);
        upload.clone_into(&mut self.rates.upload);
        Ok(())
    }

    fn set_rates_visible(&mut self, visible: bool) -> DisplayResult<()> {
        self.rates.visible = visible;
        Ok(())
    }

    fn set_busy(&mut self, busy: bool) -> DisplayResult<()> {
        self.busy = busy;
        Ok(())
    }

    fn set_sort_label(&mut self, label: &str) -> DisplayResult<()> {
        label.clone_into(&mut self.sort_label);
        Ok(())
    }
}
