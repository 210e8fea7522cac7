//! A loaded PPTX template: the source package plus its document model.

use crate::package::{
    extract_slide_number, relationships, rels_path, resolve_target, Package, CONTENT_TYPES,
};
use crate::parser::parse_slide;
use crate::writer;
use crate::xml::{local_name, Element, XmlDocument};
use deckgen_core::{Document, Error, Result};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

/// Main presentation part.
pub(crate) const PRESENTATION: &str = "ppt/presentation.xml";

/// One template slide as stored in the package.
#[derive(Debug, Clone)]
pub(crate) struct SlidePart {
    /// Part name, e.g. `ppt/slides/slide1.xml`.
    pub path: String,
    /// Relationship id in the presentation relationships.
    pub rel_id: String,
    /// The `p:sldId` entry of `p:sldIdLst`.
    pub slide_id: Element,
    pub xml: XmlDocument,
}

/// A PPTX template that can be rendered to new presentations.
///
/// The template keeps every part of the source package. Writing a document
/// patches the parts the model covers and carries the rest over untouched.
#[derive(Debug, Clone)]
pub struct PptxTemplate {
    pub(crate) package: Package,
    pub(crate) presentation: XmlDocument,
    pub(crate) presentation_rels: XmlDocument,
    pub(crate) content_types: XmlDocument,
    pub(crate) slides: Vec<SlidePart>,
    document: Document,
}

impl PptxTemplate {
    /// Load a template from a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::TemplateLoad(format!("{}: {}", path.display(), e)))?;
        log::debug!("Loading template {}", path.display());
        Self::from_reader(BufReader::new(file))
    }

    /// Load a template from an in-memory package.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load a template from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let package = Package::read(reader).map_err(|e| match e {
            Error::ZipError(msg) => Error::TemplateLoad(msg),
            other => other,
        })?;

        let presentation = package.read_xml(PRESENTATION)?;
        let presentation_rels = package.read_xml(&rels_path(PRESENTATION))?;
        let content_types = package.read_xml(CONTENT_TYPES)?;

        let mut slides = Vec::new();
        let mut document = Document::new();
        let slide_ids = presentation
            .root
            .child("sldIdLst")
            .map(|list| list.children_named("sldId").cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        for (idx, slide_id) in slide_ids.into_iter().enumerate() {
            let rel_id = relationship_id(&slide_id)
                .ok_or_else(|| Error::TemplateLoad(format!("slide entry {} has no r:id", idx + 1)))?
                .to_string();
            let target = relationships(&presentation_rels)
                .find(|r| r.attr("Id") == Some(rel_id.as_str()))
                .and_then(|r| r.attr("Target"))
                .ok_or_else(|| {
                    Error::TemplateLoad(format!("relationship '{}' not found", rel_id))
                })?;
            let path = resolve_target(PRESENTATION, target);

            let xml = package.read_xml(&path)?;
            document.add_slide(parse_slide(&xml.root, idx + 1, idx)?);
            log::debug!("Slide {} is {}", idx + 1, path);

            slides.push(SlidePart {
                path,
                rel_id,
                slide_id,
                xml,
            });
        }

        log::info!("Loaded template with {} slide(s)", slides.len());

        Ok(Self {
            package,
            presentation,
            presentation_rels,
            content_types,
            slides,
            document,
        })
    }

    /// The template's document model. Render a copy of it and pass the
    /// result to [`write`](Self::write).
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Number of slides in the template.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Write `document` as a presentation based on this template.
    pub fn write<W: Write + Seek>(&self, document: &Document, out: W) -> Result<W> {
        writer::write(self, document)?.write(out)
    }

    /// Write `document` to a new file.
    pub fn save(&self, document: &Document, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes(document)?;
        std::fs::write(path, bytes)?;
        log::info!("Saved {}", path.display());
        Ok(())
    }

    /// Write `document` into memory.
    pub fn to_bytes(&self, document: &Document) -> Result<Vec<u8>> {
        Ok(self.write(document, Cursor::new(Vec::new()))?.into_inner())
    }

    /// Part names in the source package.
    pub fn part_names(&self) -> Vec<String> {
        self.package.names().map(str::to_string).collect()
    }
}

/// The relationship id attribute (`r:id`) of a `p:sldId`.
pub(crate) fn relationship_id(slide_id: &Element) -> Option<&str> {
    relationship_key(slide_id).and_then(|key| slide_id.attr(key))
}

/// Key of the relationship id attribute, whatever its prefix.
pub(crate) fn relationship_key(slide_id: &Element) -> Option<&str> {
    slide_id
        .attributes
        .iter()
        .map(|(k, _)| k.as_str())
        .find(|k| k.contains(':') && !k.starts_with("xmlns") && local_name(k) == "id")
}

/// Highest slide part number in the package.
pub(crate) fn max_slide_part_number(package: &Package) -> usize {
    package
        .names()
        .filter_map(|n| n.strip_prefix("ppt/slides/"))
        .filter(|n| !n.contains('/') && n.starts_with("slide"))
        .filter_map(extract_slide_number)
        .max()
        .unwrap_or(0)
}
