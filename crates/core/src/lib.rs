//! Core document model and template substitution engine for generating
//! slide-deck reports from record content.

pub mod content;
pub mod error;
pub mod placeholder;
pub mod render;
pub mod table;
pub mod text;
pub mod types;

pub use content::{Content, JobMetadata, Record};
pub use error::{Error, Result};
pub use placeholder::{ListMarkerSyntax, PlaceholderKind, PlaceholderUse};
pub use render::{RecordMode, RenderOptions, RenderReport, Renderer};
pub use table::{TableOutcome, TableRebuilder, TABLE_FONT_SIZE};
pub use text::NOT_AVAILABLE;
pub use types::{
    Document, FontSize, Geometry, Paragraph, RunFormat, Shape, Slide, Table, TableCell, TableRow,
    TextFrame, TextRun,
};
