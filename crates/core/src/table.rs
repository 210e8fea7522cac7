//! Table placeholder rebuilding.
//!
//! A table placeholder is a skeleton table whose top-left cell names a list
//! in the content. The skeleton is replaced by a new table with one header
//! row and one row per list element, at the same position and size. When the
//! list is missing or empty the skeleton stays and shows `n/a`.

use crate::content::{stringify, Content};
use crate::placeholder::ListMarkerSyntax;
use crate::text::NOT_AVAILABLE;
use crate::types::{FontSize, RunFormat, Slide, Table};
use serde_json::Value;

/// Font size every placeholder table ends up with.
pub const TABLE_FONT_SIZE: FontSize = FontSize::from_points(11);

/// What happened to a table shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOutcome {
    /// Replaced by a new table of this size, header row included.
    Rebuilt { rows: usize, columns: usize },
    /// No usable list: the top-left cell now reads `n/a`.
    Collapsed,
    /// Not a table placeholder.
    Skipped,
}

/// Rebuilds table placeholders from list content.
#[derive(Debug, Clone, Copy)]
pub struct TableRebuilder {
    syntax: ListMarkerSyntax,
    font_size: FontSize,
}

impl Default for TableRebuilder {
    fn default() -> Self {
        Self {
            syntax: ListMarkerSyntax::default(),
            font_size: TABLE_FONT_SIZE,
        }
    }
}

impl TableRebuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how the top-left cell names the list.
    pub fn with_syntax(mut self, syntax: ListMarkerSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Set the font size applied to every cell once the table is written.
    pub fn with_font_size(mut self, size: FontSize) -> Self {
        self.font_size = size;
        self
    }

    /// Rebuild every table placeholder on a slide.
    ///
    /// The table shapes are collected first, so tables created here are not
    /// visited again.
    pub fn rebuild_slide(&self, slide: &mut Slide, content: &Content) -> Vec<TableOutcome> {
        slide
            .table_shape_ids()
            .into_iter()
            .map(|id| self.rebuild(slide, id, content))
            .collect()
    }

    /// Rebuild one table shape from the list its top-left cell names.
    pub fn rebuild(&self, slide: &mut Slide, shape_id: u32, content: &Content) -> TableOutcome {
        let Some(shape) = slide.shape_mut(shape_id) else {
            return TableOutcome::Skipped;
        };
        let Some(table) = shape.table.as_mut() else {
            return TableOutcome::Skipped;
        };
        let Some(marker) = table.cell(0, 0).map(|c| c.text()) else {
            return TableOutcome::Skipped;
        };
        let Some(name) = self.syntax.identifier(&marker) else {
            log::debug!("Table '{}' has no list marker, leaving it", shape.name);
            return TableOutcome::Skipped;
        };

        let Some((rows, headers)) = content.rows(&name).and_then(|rows| {
            let headers = headers(rows)?;
            Some((rows, headers))
        }) else {
            log::debug!("No rows for list '{}', collapsing table '{}'", name, shape.name);
            self.collapse(table);
            return TableOutcome::Collapsed;
        };

        let geometry = shape.geometry.unwrap_or_default();
        let format = placeholder_format(table);
        slide.remove_shape(shape_id);

        let row_count = rows.len() + 1;
        let column_count = headers.len();
        let shape = slide.add_table(row_count, column_count, geometry);
        if let Some(table) = shape.table.as_mut() {
            for run in table.runs_mut() {
                run.format = format;
            }
            self.fill(table, &headers, rows);
        }
        log::debug!(
            "Rebuilt list '{}' as {}x{} table '{}'",
            name,
            row_count,
            column_count,
            shape.name
        );

        TableOutcome::Rebuilt {
            rows: row_count,
            columns: column_count,
        }
    }

    fn collapse(&self, table: &mut Table) {
        if let Some(cell) = table.cell_mut(0, 0) {
            cell.set_text(NOT_AVAILABLE);
            // The marker's run properties go with it; paragraph defaults stay.
            for run in cell.text_frame.runs_mut() {
                run.format = RunFormat::default();
            }
        }
        self.apply_font_size(table);
    }

    fn fill(&self, table: &mut Table, headers: &[String], rows: &[Value]) {
        for (col, header) in headers.iter().enumerate() {
            if let Some(cell) = table.cell_mut(0, col) {
                cell.set_text(header.as_str());
            }
        }

        for (idx, item) in rows.iter().enumerate() {
            for (col, header) in headers.iter().enumerate() {
                let value = item.get(header).map(stringify).unwrap_or_default();
                if let Some(cell) = table.cell_mut(idx + 1, col) {
                    cell.set_text(value);
                }
            }
        }

        self.apply_font_size(table);
    }

    fn apply_font_size(&self, table: &mut Table) {
        for run in table.runs_mut() {
            run.format.size = Some(self.font_size);
        }
    }
}

/// Column headers: the keys of the first row, in its order. None when the
/// first row is not an object or has no keys.
fn headers(rows: &[Value]) -> Option<Vec<String>> {
    match rows.first() {
        Some(Value::Object(first)) if !first.is_empty() => Some(first.keys().cloned().collect()),
        _ => None,
    }
}

/// Format of the placeholder cell's first paragraph: its default run format,
/// falling back to its first run.
fn placeholder_format(table: &Table) -> RunFormat {
    let Some(paragraph) = table
        .cell(0, 0)
        .and_then(|c| c.text_frame.paragraphs.first())
    else {
        return RunFormat::default();
    };
    let run = paragraph.runs.first().map(|r| r.format).unwrap_or_default();
    RunFormat {
        size: paragraph.default_format.size.or(run.size),
        bold: paragraph.default_format.bold.or(run.bold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Geometry, Shape, TextFrame};
    use serde_json::json;

    fn placeholder_slide(marker: &str) -> Slide {
        let mut slide = Slide::new(1, 0);
        slide.add_shape(Shape::new(2, "Title 1").with_text_frame(TextFrame::with_text("Orders")));

        let mut table = Table::new(1, 1, 6000, 1200);
        let cell = table.cell_mut(0, 0).unwrap();
        cell.set_text(marker);
        cell.text_frame.paragraphs[0].runs[0].format = RunFormat {
            size: Some(FontSize::from_points(18)),
            bold: Some(true),
        };
        slide.add_shape(
            Shape::new(3, "Table 2")
                .with_origin(1)
                .with_geometry(Geometry::new(100, 200, 6000, 1200))
                .with_table(table),
        );
        slide
    }

    fn orders() -> Content {
        let mut content = Content::new();
        content.insert(
            "orders",
            json!([
                {"item": "Bolt", "qty": 10},
                {"item": "Nut", "qty": 25},
                {"item": "Washer", "qty": 5}
            ]),
        );
        content
    }

    fn grid(table: &Table) -> Vec<Vec<String>> {
        table
            .rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.text()).collect())
            .collect()
    }

    #[test]
    fn test_rebuild_from_rows() {
        let mut slide = placeholder_slide("{{table:orders}}");
        let outcome = TableRebuilder::new().rebuild(&mut slide, 3, &orders());

        assert_eq!(outcome, TableOutcome::Rebuilt { rows: 4, columns: 2 });
        assert_eq!(slide.shapes.len(), 2);
        assert!(slide.shapes.iter().all(|s| s.origin() != Some(1)));

        let shape = slide.shape(3).unwrap();
        assert_eq!(shape.origin(), None);
        assert_eq!(shape.geometry, Some(Geometry::new(100, 200, 6000, 1200)));

        let table = shape.table.as_ref().unwrap();
        assert_eq!(
            grid(table),
            vec![
                vec!["item", "qty"],
                vec!["Bolt", "10"],
                vec!["Nut", "25"],
                vec!["Washer", "5"],
            ]
        );
        assert_eq!(table.columns, vec![3000, 3000]);
        assert!(table.rows.iter().all(|r| r.height == 300));
    }

    #[test]
    fn test_rebuild_uses_fixed_font_and_captured_bold() {
        let mut slide = placeholder_slide("{{table:orders}}");
        TableRebuilder::new().rebuild(&mut slide, 3, &orders());

        let table = slide.shapes.last().unwrap().table.as_ref().unwrap();
        for cell in table.cells() {
            let run = &cell.text_frame.paragraphs[0].runs[0];
            assert_eq!(run.format.size, Some(TABLE_FONT_SIZE));
            assert_eq!(run.format.bold, Some(true));
        }
    }

    #[test]
    fn test_columns_come_from_first_row() {
        let mut content = Content::new();
        content.insert(
            "orders",
            json!([
                {"item": "Bolt", "qty": 10},
                {"item": "Nut", "colour": "red"},
                "not a record"
            ]),
        );
        let mut slide = placeholder_slide("{{table:orders}}");
        let outcome = TableRebuilder::new().rebuild(&mut slide, 3, &content);

        assert_eq!(outcome, TableOutcome::Rebuilt { rows: 4, columns: 2 });
        let table = slide.shapes.last().unwrap().table.as_ref().unwrap();
        assert_eq!(
            grid(table),
            vec![
                vec!["item", "qty"],
                vec!["Bolt", "10"],
                vec!["Nut", ""],
                vec!["", ""],
            ]
        );
    }

    #[test]
    fn test_collapse_when_list_unusable() {
        let mut content = Content::new();
        content.insert("empty", json!([]));
        content.insert("scalar", "text");
        content.insert("numbers", json!([1, 2]));

        for marker in [
            "{{table:missing}}",
            "{{table:empty}}",
            "{{table:scalar}}",
            "{{table:numbers}}",
        ] {
            let mut slide = placeholder_slide(marker);
            let outcome = TableRebuilder::new().rebuild(&mut slide, 3, &content);
            assert_eq!(outcome, TableOutcome::Collapsed, "{}", marker);

            let shape = slide.shape(3).unwrap();
            assert_eq!(shape.geometry, Some(Geometry::new(100, 200, 6000, 1200)));
            let table = shape.table.as_ref().unwrap();
            assert_eq!((table.row_count(), table.column_count()), (1, 1));
            assert_eq!(grid(table), vec![vec!["n/a"]]);
            let run = &table.cell(0, 0).unwrap().text_frame.paragraphs[0].runs[0];
            assert_eq!(
                run.format,
                RunFormat {
                    size: Some(TABLE_FONT_SIZE),
                    bold: None
                }
            );
        }
    }

    #[test]
    fn test_delimited_skips_plain_table() {
        let mut slide = placeholder_slide("Name");
        let before = slide.clone();
        let rebuilder = TableRebuilder::new().with_syntax(ListMarkerSyntax::Delimited);
        assert_eq!(rebuilder.rebuild(&mut slide, 3, &orders()), TableOutcome::Skipped);
        assert_eq!(slide, before);
    }

    #[test]
    fn test_default_collapses_any_table() {
        for marker in ["Name", "{{{ orders }}}"] {
            let mut slide = placeholder_slide(marker);
            assert_eq!(
                TableRebuilder::new().rebuild(&mut slide, 3, &orders()),
                TableOutcome::Collapsed,
                "{}",
                marker
            );
            let table = slide.shape(3).unwrap().table.as_ref().unwrap();
            assert_eq!(table.cell(0, 0).unwrap().text(), "n/a");
        }
    }

    #[test]
    fn test_delimited_rebuilds_whole_tag_marker() {
        let mut slide = placeholder_slide("{{ orders }}");
        let rebuilder = TableRebuilder::new().with_syntax(ListMarkerSyntax::Delimited);
        assert_eq!(
            rebuilder.rebuild(&mut slide, 3, &orders()),
            TableOutcome::Rebuilt { rows: 4, columns: 2 }
        );
    }

    #[test]
    fn test_rebuild_slide_does_not_revisit_new_tables() {
        let mut slide = placeholder_slide("{{table:orders}}");
        let outcomes = TableRebuilder::new().rebuild_slide(&mut slide, &orders());
        assert_eq!(outcomes, vec![TableOutcome::Rebuilt { rows: 4, columns: 2 }]);
        assert_eq!(slide.table_shape_ids().len(), 1);
    }

    #[test]
    fn test_default_paragraph_format_wins() {
        let mut slide = placeholder_slide("{{table:orders}}");
        if let Some(table) = slide.shape_mut(3).and_then(|s| s.table.as_mut()) {
            table.cell_mut(0, 0).unwrap().text_frame.paragraphs[0].default_format.bold = Some(false);
        }
        TableRebuilder::new().rebuild(&mut slide, 3, &orders());
        let table = slide.shapes.last().unwrap().table.as_ref().unwrap();
        assert_eq!(table.cell(0, 0).unwrap().text_frame.paragraphs[0].runs[0].format.bold, Some(false));
    }

    #[test]
    fn test_custom_font_size() {
        let mut slide = placeholder_slide("{{table:orders}}");
        TableRebuilder::new()
            .with_font_size(FontSize::from_points(9))
            .rebuild(&mut slide, 3, &orders());
        let table = slide.shapes.last().unwrap().table.as_ref().unwrap();
        assert_eq!(
            table.cell(1, 1).unwrap().text_frame.paragraphs[0].runs[0].format.size,
            Some(FontSize(900))
        );
    }
}
