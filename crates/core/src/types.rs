//! Domain types for an in-memory slide deck.
//!
//! The model only covers what template rendering touches: slides, shapes,
//! formatted text and tables. Package writers keep everything else from the
//! source file and use the `origin` fields to correlate the two.

use serde::{Deserialize, Serialize};

/// A slide deck: slides in presentation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slide to the document.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Reassign 1-based slide numbers after slides were added or reordered.
    pub fn renumber(&mut self) {
        for (idx, slide) in self.slides.iter_mut().enumerate() {
            slide.number = idx + 1;
        }
    }

    /// Visible text of every paragraph and every table cell, in slide order.
    pub fn all_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for shape in self.slides.iter().flat_map(|s| s.shapes.iter()) {
            if let Some(frame) = &shape.text_frame {
                lines.extend(frame.paragraphs.iter().map(Paragraph::text));
            }
            if let Some(table) = &shape.table {
                lines.extend(table.cells().map(TableCell::text));
            }
        }
        lines
    }
}

/// A single slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Index of the template slide this slide was produced from.
    pub origin: usize,

    /// Shapes in z-order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create a new slide with the given number and template origin.
    pub fn new(number: usize, origin: usize) -> Self {
        Self {
            number,
            origin,
            shapes: Vec::new(),
        }
    }

    /// Add a shape on top of the existing ones.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Find a shape by id.
    pub fn shape(&self, id: u32) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    /// Find a shape by id for mutation.
    pub fn shape_mut(&mut self, id: u32) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id == id)
    }

    /// Remove a shape by id, returning it if it was present.
    pub fn remove_shape(&mut self, id: u32) -> Option<Shape> {
        let pos = self.shapes.iter().position(|s| s.id == id)?;
        Some(self.shapes.remove(pos))
    }

    /// The id a newly added shape receives.
    pub fn next_shape_id(&self) -> u32 {
        self.shapes.iter().map(|s| s.id).max().unwrap_or(1) + 1
    }

    /// Ids of all table-bearing shapes, in z-order.
    pub fn table_shape_ids(&self) -> Vec<u32> {
        self.shapes
            .iter()
            .filter(|s| s.has_table())
            .map(|s| s.id)
            .collect()
    }

    /// Add a new table shape with evenly sized rows and columns.
    pub fn add_table(&mut self, rows: usize, cols: usize, geometry: Geometry) -> &mut Shape {
        let id = self.next_shape_id();
        let table = Table::new(rows, cols, geometry.width, geometry.height);
        let shape = Shape::new(id, format!("Table {}", id - 1))
            .with_geometry(geometry)
            .with_table(table);
        self.shapes.push(shape);
        let last = self.shapes.len() - 1;
        &mut self.shapes[last]
    }
}

/// Position and size of a shape, in EMU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Geometry {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// A shape on a slide. It may carry a text body, a table, both or neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Shape id, unique within its slide.
    pub id: u32,

    /// Display name.
    pub name: String,

    /// Explicit position and size. None when inherited from a layout.
    pub geometry: Option<Geometry>,

    /// Formatted text body, if the shape has one.
    pub text_frame: Option<TextFrame>,

    /// Table, if the shape holds one.
    pub table: Option<Table>,

    origin: Option<usize>,
}

impl Shape {
    /// Create a shape with no geometry, text or table.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            geometry: None,
            text_frame: None,
            table: None,
            origin: None,
        }
    }

    /// Record the position of this shape in the template slide's shape list.
    pub fn with_origin(mut self, origin: usize) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_text_frame(mut self, frame: TextFrame) -> Self {
        self.text_frame = Some(frame);
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    /// Position in the template slide's shape list. None for shapes created
    /// after loading.
    pub fn origin(&self) -> Option<usize> {
        self.origin
    }

    pub fn has_text_frame(&self) -> bool {
        self.text_frame.is_some()
    }

    pub fn has_table(&self) -> bool {
        self.table.is_some()
    }
}

/// Font size in hundredths of a point, the unit OOXML stores in `sz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FontSize(pub u32);

impl FontSize {
    /// Create a font size from whole points.
    pub const fn from_points(points: u32) -> Self {
        Self(points * 100)
    }

    /// Size in points.
    pub fn points(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

/// Character formatting the engine reads and writes. Unset fields inherit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFormat {
    pub size: Option<FontSize>,
    pub bold: Option<bool>,
}

/// A run of text sharing one format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub format: RunFormat,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: RunFormat::default(),
        }
    }

    pub fn with_format(mut self, format: RunFormat) -> Self {
        self.format = format;
        self
    }
}

/// A paragraph: an ordered list of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,

    /// Paragraph-level default run format (`a:pPr/a:defRPr` in OOXML).
    pub default_format: RunFormat,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a run at the end of the paragraph.
    pub fn with_run(mut self, run: TextRun) -> Self {
        self.runs.push(run);
        self
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A formatted text body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

impl TextFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame holding one paragraph with one unformatted run.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![Paragraph::new().with_run(TextRun::new(text))],
        }
    }

    /// Paragraph texts joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every run of every paragraph.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut TextRun> {
        self.paragraphs.iter_mut().flat_map(|p| p.runs.iter_mut())
    }
}

/// A table: column widths and rows of cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column widths in EMU.
    pub columns: Vec<i64>,

    pub rows: Vec<TableRow>,
}

impl Table {
    /// Create a `rows` x `cols` table filling `width` x `height` evenly.
    ///
    /// Every cell starts with one paragraph holding one empty run, so
    /// formatting can be applied before content is written.
    pub fn new(rows: usize, cols: usize, width: i64, height: i64) -> Self {
        let col_width = if cols > 0 { width / cols as i64 } else { 0 };
        let row_height = if rows > 0 { height / rows as i64 } else { 0 };

        Self {
            columns: vec![col_width; cols],
            rows: (0..rows)
                .map(|_| TableRow {
                    height: row_height,
                    cells: (0..cols).map(|_| TableCell::new()).collect(),
                })
                .collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col))
    }

    /// All cells, row by row.
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.rows.iter().flat_map(|r| r.cells.iter())
    }

    /// All cells, row by row, for mutation.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut TableCell> {
        self.rows.iter_mut().flat_map(|r| r.cells.iter_mut())
    }

    /// Every run in every cell.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut TextRun> {
        self.cells_mut().flat_map(|c| c.text_frame.runs_mut())
    }
}

/// A table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Row height in EMU.
    pub height: i64,

    pub cells: Vec<TableCell>,
}

/// A table cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub text_frame: TextFrame,
}

impl TableCell {
    /// A cell with one paragraph holding one empty run.
    pub fn new() -> Self {
        Self {
            text_frame: TextFrame::with_text(""),
        }
    }

    /// Cell text, paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.text_frame.text()
    }

    /// Replace the cell content with a single run.
    ///
    /// The run keeps the format of the cell's first existing run, so styling
    /// applied to an empty cell survives writing its content.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let first = self.text_frame.paragraphs.first();
        let default_format = first.map(|p| p.default_format).unwrap_or_default();
        let format = first
            .and_then(|p| p.runs.first())
            .map(|r| r.format)
            .unwrap_or_default();

        self.text_frame.paragraphs = vec![Paragraph {
            runs: vec![TextRun::new(text).with_format(format)],
            default_format,
        }];
    }
}
