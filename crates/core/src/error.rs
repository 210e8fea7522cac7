//! Error types for template loading, rendering and saving.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while working with a slide-deck template.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The template file is missing, corrupt, or not a slide deck.
    #[error("Failed to load template: {0}")]
    TemplateLoad(String),

    /// A record's embedded content could not be decoded.
    #[error("Failed to decode record content: {0}")]
    ContentDecode(String),

    /// The document model does not fit the package it is written into.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),
}
