//! Display surface that prints the list to a terminal.
//!
//! The rows live in a [`ListModel`]. A live surface writes a frame each time
//! the poll loop clears the busy indicator, which happens once per successful
//! tick; a deferred one only writes when asked to.

use std::io::Write;

use seedwatch_core::{
    DisplayError, DisplayItem, DisplayResult, DisplaySurface, ListModel, ListRow,
    present::PROPERTY_PROGRESS,
};

const PROGRESS_CELLS: usize = 10;

/// Terminal-backed display surface.
#[derive(Debug)]
pub struct ConsoleSurface<W> {
    model: ListModel,
    out: W,
    frames: usize,
    live: bool,
}

impl<W> ConsoleSurface<W>
where
    W: Write + Send,
{
    /// Surface writing a frame to `out` after every tick.
    pub fn new(out: W) -> Self {
        Self {
            model: ListModel::new(),
            out,
            frames: 0,
            live: true,
        }
    }

    /// Surface that only writes on [`ConsoleSurface::draw`].
    pub fn deferred(out: W) -> Self {
        Self {
            live: false,
            ..Self::new(out)
        }
    }

    /// Rows currently held.
    #[must_use]
    pub const fn model(&self) -> &ListModel {
        &self.model
    }

    /// Number of frames written so far.
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.frames
    }

    /// Release the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write the current list as one frame.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Unavailable`] when the writer fails.
    pub fn draw(&mut self) -> DisplayResult<()> {
        let frame = render_frame(&self.model);
        self.out
            .write_all(frame.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|err| DisplayError::unavailable("draw", err.to_string()))?;
        self.frames += 1;
        Ok(())
    }
}

/// Text for one frame: a header with rates and sort order, then one block per row.
#[must_use]
pub fn render_frame(model: &ListModel) -> String {
    let mut frame = String::new();
    let rates = model.rates();
    let mut header = Vec::new();
    if rates.visible {
        header.push(format!("DL: {}  UL: {}", rates.download, rates.upload));
    }
    if !model.sort_label().is_empty() {
        header.push(format!("[{}]", model.sort_label()));
    }
    header.push(format!("{} torrents", model.rows().len()));
    frame.push_str(&header.join("  "));
    frame.push('\n');
    for row in model.rows() {
        frame.push_str(&render_row(row));
    }
    frame
}

fn render_row(row: &ListRow) -> String {
    let mut text = format!(
        "{:>3} {} {:<12} {}\n",
        row.item.position + 1,
        progress_bar(row),
        row.item.record.status.as_str(),
        row.label
    );
    for line in [&row.description, &row.tagline] {
        if !line.is_empty() {
            text.push_str("                ");
            text.push_str(line);
            text.push('\n');
        }
    }
    text
}

fn progress_bar(row: &ListRow) -> String {
    let bucket = row
        .properties
        .get(PROPERTY_PROGRESS)
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let filled = (bucket / PROGRESS_CELLS).min(PROGRESS_CELLS);
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_CELLS - filled)
    )
}

impl<W> DisplaySurface for ConsoleSurface<W>
where
    W: Write + Send,
{
    fn current_items(&self) -> DisplayResult<Vec<DisplayItem>> {
        self.model.current_items()
    }

    fn set_items(&mut self, items: Vec<DisplayItem>) -> DisplayResult<()> {
        self.model.set_items(items)
    }

    fn item(&self, position: usize) -> DisplayResult<Option<DisplayItem>> {
        self.model.item(position)
    }

    fn update_item(&mut self, item: &DisplayItem) -> DisplayResult<()> {
        self.model.update_item(item)
    }

    fn focused_item(&self) -> DisplayResult<Option<DisplayItem>> {
        self.model.focused_item()
    }

    fn set_focused_item(&mut self, item: &DisplayItem) -> DisplayResult<()> {
        self.model.set_focused_item(item)
    }

    fn set_label(&mut self, position: usize, label: &str) -> DisplayResult<()> {
        self.model.set_label(position, label)
    }

    fn set_description(&mut self, position: usize, description: &str) -> DisplayResult<()> {
        self.model.set_description(position, description)
    }

    fn set_tagline(&mut self, position: usize, tagline: &str) -> DisplayResult<()> {
        self.model.set_tagline(position, tagline)
    }

    fn set_property(&mut self, position: usize, key: &str, value: &str) -> DisplayResult<()> {
        self.model.set_property(position, key, value)
    }

    fn property(&self, position: usize, key: &str) -> DisplayResult<Option<String>> {
        self.model.property(position, key)
    }

    fn set_transfer_rates(&mut self, download: &str, upload: &str) -> DisplayResult<()> {
        self.model.set_transfer_rates(download, upload)
    }

    fn set_rates_visible(&mut self, visible: bool) -> DisplayResult<()> {
        self.model.set_rates_visible(visible)
    }

    fn set_busy(&mut self, busy: bool) -> DisplayResult<()> {
        self.model.set_busy(busy)?;
        if busy || !self.live {
            Ok(())
        } else {
            self.draw()
        }
    }

    fn set_sort_label(&mut self, label: &str) -> DisplayResult<()> {
        self.model.set_sort_label(label)
    }
}
