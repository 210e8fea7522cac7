//! PPTX (Office Open XML) backend: loads a presentation template into the
//! document model and writes rendered documents back as new packages.
//!
//! PPTX files are ZIP archives of XML parts. Only the parts a rendered
//! document changes are rewritten; everything else is copied as-is.

mod package;
mod parser;
mod template;
mod writer;
mod xml;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use template::PptxTemplate;
