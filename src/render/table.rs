//! Bordered, word-wrapped table layout over paginated pages.
//!
//! Layout produces backend-neutral [`DrawCommand`]s in millimetres with the
//! origin at the bottom-left of the page; [`crate::render::pdf`] turns them
//! into PDF operations. Rows are never split across pages.

use tracing::{debug, warn};

use super::text::{sanitize, wrap, Measure};
use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    /// A4 portrait with 10 mm margins.
    pub const A4: PageGeometry = PageGeometry {
        width: 210.0,
        height: 297.0,
        margin_left: 10.0,
        margin_top: 10.0,
        margin_bottom: 10.0,
    };

    pub fn usable_width(&self) -> f32 {
        self.width - 2.0 * self.margin_left
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStyle {
    pub line_height: f32,
    /// Horizontal inset of text inside a cell, on each side.
    pub cell_padding: f32,
    /// Distance from the bottom of a text line to its baseline.
    pub baseline_offset: f32,
    pub body_size: f32,
    pub title_size: f32,
    pub section_gap: f32,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            line_height: 5.0,
            cell_padding: 2.0,
            baseline_offset: 1.5,
            body_size: 9.0,
            title_size: 12.0,
            section_gap: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub header: &'static str,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Text {
        x: f32,
        y: f32,
        text: String,
        size_pt: f32,
        bold: bool,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<Page>,
    /// Characters replaced because the font cannot encode them.
    pub substitutions: usize,
}

/// Wrapped cell lines for one row, every cell padded to `line_count` lines.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub cells: Vec<Vec<String>>,
    pub line_count: usize,
    pub height: f32,
}

/// Wrap each cell to its column and pad all cells to the tallest one.
pub fn layout_row<M>(texts: &[&str], widths: &[f32], style: &TableStyle, measure: &M) -> RowLayout
where
    M: Measure + ?Sized,
{
    let mut cells: Vec<Vec<String>> = texts
        .iter()
        .zip(widths)
        .map(|(text, width)| wrap(text, width - 2.0 * style.cell_padding, measure))
        .collect();
    let line_count = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    for cell in &mut cells {
        cell.resize(line_count, String::new());
    }
    RowLayout {
        cells,
        line_count,
        height: line_count as f32 * style.line_height,
    }
}

pub struct TableRenderer<'m> {
    geometry: PageGeometry,
    style: TableStyle,
    columns: Vec<Column>,
    regular: &'m dyn Measure,
    bold: &'m dyn Measure,
    title: &'m dyn Measure,
    pages: Vec<Page>,
    /// Top of the free area on the current page.
    cursor: f32,
    substitutions: usize,
}

impl<'m> TableRenderer<'m> {
    pub fn new(
        geometry: PageGeometry,
        style: TableStyle,
        columns: Vec<Column>,
        regular: &'m dyn Measure,
        bold: &'m dyn Measure,
        title: &'m dyn Measure,
    ) -> Result<Self, RenderError> {
        if columns.is_empty() {
            return Err(RenderError::Layout("table has no columns".into()));
        }
        let total: f32 = columns.iter().map(|c| c.width).sum();
        if total > geometry.usable_width() + f32::EPSILON {
            return Err(RenderError::Layout(format!(
                "columns span {total} mm but only {} mm are usable",
                geometry.usable_width()
            )));
        }
        if let Some(narrow) = columns.iter().find(|c| c.width <= 2.0 * style.cell_padding) {
            return Err(RenderError::Layout(format!(
                "column {} is narrower than its padding",
                narrow.header
            )));
        }
        Ok(Self {
            geometry,
            style,
            columns,
            regular,
            bold,
            title,
            pages: vec![Page::default()],
            cursor: geometry.height - geometry.margin_top,
            substitutions: 0,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn remaining(&self) -> f32 {
        self.cursor - self.geometry.margin_bottom
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor = self.geometry.height - self.geometry.margin_top;
        debug!(page = self.pages.len(), "Started new page");
    }

    /// Break the page if `height` does not fit. A fresh page always accepts
    /// the block, even when it is taller than the page.
    fn reserve(&mut self, height: f32) {
        let fresh = self
            .pages
            .last()
            .map_or(true, |page| page.commands.is_empty());
        if height > self.remaining() && !fresh {
            self.new_page();
        }
    }

    fn clean(&mut self, text: &str) -> String {
        let (cleaned, replaced) = sanitize(text);
        self.substitutions += replaced;
        cleaned
    }

    fn push(&mut self, command: DrawCommand) {
        if let Some(page) = self.pages.last_mut() {
            page.commands.push(command);
        }
    }

    fn widths(&self) -> Vec<f32> {
        self.columns.iter().map(|c| c.width).collect()
    }

    /// Layout of a row without recording substitutions.
    fn measure_row(&self, texts: &[&str], bold: bool) -> RowLayout {
        let cleaned: Vec<String> = texts.iter().map(|t| sanitize(t).0).collect();
        let refs: Vec<&str> = cleaned.iter().map(String::as_str).collect();
        let measure = if bold { self.bold } else { self.regular };
        layout_row(&refs, &self.widths(), &self.style, measure)
    }

    /// Bold section title followed by the header row. Title, header and
    /// `first_row` start on a new page unless all three fit on this one.
    pub fn section(&mut self, title: &str, first_row: Option<&[&str]>) {
        let text = self.clean(title);
        let lines = wrap(&text, self.geometry.usable_width(), self.title);
        let line_height = self.style.line_height * 1.5;
        let headers: Vec<&'static str> = self.columns.iter().map(|c| c.header).collect();

        let mut block = line_height * lines.len() as f32 + self.measure_row(&headers, true).height;
        if let Some(row) = first_row {
            block += self.measure_row(row, false).height;
        }
        self.reserve(block);

        for line in lines {
            let y = self.cursor - line_height + self.style.baseline_offset;
            self.push(DrawCommand::Text {
                x: self.geometry.margin_left,
                y,
                text: line,
                size_pt: self.style.title_size,
                bold: true,
            });
            self.cursor -= line_height;
        }
        self.draw_row(&headers, true);
    }

    pub fn row(&mut self, texts: &[&str]) {
        self.draw_row(texts, false);
    }

    pub fn gap(&mut self) {
        self.cursor = (self.cursor - self.style.section_gap).max(self.geometry.margin_bottom);
    }

    fn draw_row(&mut self, texts: &[&str], bold: bool) {
        let cleaned: Vec<String> = texts.iter().map(|t| self.clean(t)).collect();
        let refs: Vec<&str> = cleaned.iter().map(String::as_str).collect();
        let widths = self.widths();
        let measure = if bold { self.bold } else { self.regular };
        let row = layout_row(&refs, &widths, &self.style, measure);

        self.reserve(row.height);
        let top = self.cursor;
        let mut x = self.geometry.margin_left;
        for (cell, width) in row.cells.iter().zip(&widths) {
            self.push(DrawCommand::Rect {
                x,
                y: top - row.height,
                width: *width,
                height: row.height,
            });
            for (i, line) in cell.iter().enumerate() {
                if line.is_empty() {
                    continue;
                }
                self.push(DrawCommand::Text {
                    x: x + self.style.cell_padding,
                    y: top - (i as f32 + 1.0) * self.style.line_height + self.style.baseline_offset,
                    text: line.clone(),
                    size_pt: self.style.body_size,
                    bold,
                });
            }
            x += width;
        }
        self.cursor -= row.height;
    }

    pub fn finish(self) -> Document {
        if self.substitutions > 0 {
            warn!(
                substituted = self.substitutions,
                "Replaced characters the report font cannot encode"
            );
        }
        Document {
            width: self.geometry.width,
            height: self.geometry.height,
            pages: self.pages,
            substitutions: self.substitutions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn per_char(text: &str) -> f32 {
        text.chars().count() as f32
    }

    fn renderer<'m>(measure: &'m dyn Measure, height: f32) -> TableRenderer<'m> {
        let geometry = PageGeometry {
            width: 60.0,
            height,
            margin_left: 5.0,
            margin_top: 5.0,
            margin_bottom: 5.0,
        };
        let columns = vec![
            Column { header: "Name", width: 25.0 },
            Column { header: "Email", width: 25.0 },
        ];
        TableRenderer::new(geometry, TableStyle::default(), columns, measure, measure, measure)
            .unwrap()
    }

    #[test]
    fn row_height_follows_tallest_cell() {
        let style = TableStyle::default();
        let row = layout_row(
            &["one", "two two two", "three three"],
            &[10.0, 10.0, 10.0],
            &style,
            &per_char,
        );
        // usable width 6: "one" | "two" "two" "two" | "three" "three"
        assert_eq!(row.line_count, 3);
        assert_eq!(row.height, 3.0 * style.line_height);
        assert!(row.cells.iter().all(|cell| cell.len() == 3));
        assert_eq!(row.cells[0], vec!["one", "", ""]);
    }

    #[test]
    fn rows_never_split_across_pages() {
        let measure = per_char;
        // 40 mm page, 30 mm usable: six 5 mm rows fit, the seventh breaks.
        let mut table = renderer(&measure, 40.0);
        for _ in 0..7 {
            table.row(&["a", "b"]);
        }
        assert_eq!(table.page_count(), 2);
        let doc = table.finish();
        let rects_on_second: Vec<_> = doc.pages[1]
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Rect { y, height, .. } => Some((*y, *height)),
                _ => None,
            })
            .collect();
        assert_eq!(rects_on_second.len(), 2);
        assert_eq!(rects_on_second[0], (40.0 - 5.0 - 5.0, 5.0));
    }

    #[test]
    fn tall_row_moves_whole_to_next_page() {
        let measure = per_char;
        let mut table = renderer(&measure, 40.0);
        for _ in 0..4 {
            table.row(&["a", "b"]);
        }
        // 10 mm left; a 50 character word wraps to three lines in a 21 mm cell.
        let long = "x".repeat(50);
        table.row(&[&long, "y"]);
        let doc = table.finish();
        assert_eq!(doc.pages.len(), 2);
        let texts = doc.pages[1]
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Text { .. }))
            .count();
        assert_eq!(texts, 4);
    }

    #[test]
    fn columns_wider_than_page_are_rejected() {
        let measure = per_char;
        let columns = vec![Column { header: "Name", width: 500.0 }];
        let result = TableRenderer::new(
            PageGeometry::A4,
            TableStyle::default(),
            columns,
            &measure,
            &measure,
            &measure,
        );
        assert!(result.is_err());
    }

    #[test]
    fn substitutions_are_counted() {
        let measure = per_char;
        let mut table = renderer(&measure, 100.0);
        table.row(&["Zoë 王", "✓"]);
        assert_eq!(table.finish().substitutions, 2);
    }

    fn texts_on(page: &Page) -> Vec<&str> {
        page.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn section_title_stays_with_header_and_first_row() {
        let measure = per_char;
        let mut table = renderer(&measure, 40.0);
        for _ in 0..4 {
            table.row(&["a", "b"]);
        }
        // 10 mm left; title, header and first row need 17.5 mm.
        table.section("Viewers", Some(&["Vic", "vic@example.com"]));
        table.row(&["Vic", "vic@example.com"]);
        let doc = table.finish();

        assert_eq!(doc.pages.len(), 2);
        assert!(!texts_on(&doc.pages[0]).contains(&"Viewers"));
        assert_eq!(
            &texts_on(&doc.pages[1])[..4],
            &["Viewers", "Name", "Email", "Vic"]
        );
    }

    #[test]
    fn section_without_rows_still_keeps_title_with_header() {
        let measure = per_char;
        let mut table = renderer(&measure, 40.0);
        for _ in 0..4 {
            table.row(&["a", "b"]);
        }
        // 10 mm left; title and header need 12.5 mm.
        table.section("Managers", None);
        let doc = table.finish();

        assert_eq!(doc.pages.len(), 2);
        assert_eq!(texts_on(&doc.pages[1]), vec!["Managers", "Name", "Email"]);
    }

    #[test]
    fn section_that_fits_stays_on_current_page() {
        let measure = per_char;
        let mut table = renderer(&measure, 100.0);
        table.row(&["a", "b"]);
        table.section("Contributors", Some(&["c", "d"]));
        assert_eq!(table.page_count(), 1);
    }
}
