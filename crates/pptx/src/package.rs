//! OPC package access: the ZIP container and its relationship parts.

use crate::xml::{Element, XmlDocument};
use deckgen_core::{Error, Result};
use std::io::{Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Content types part.
pub(crate) const CONTENT_TYPES: &str = "[Content_Types].xml";

/// Relationship type of a slide.
pub(crate) const REL_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// Relationship type suffix of a notes slide.
pub(crate) const REL_NOTES_SLIDE_SUFFIX: &str = "/notesSlide";

/// Content type of a slide part.
pub(crate) const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// All entries of a package, in archive order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Package {
    entries: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// Read every file entry of a ZIP archive.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        for idx in 0..archive.len() {
            let mut file = archive
                .by_index(idx)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", idx, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
            entries.push((name, data));
        }

        Ok(Self { entries })
    }

    /// Write all entries as a new archive.
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
            zip.write_all(data)?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Replace an entry, or append it.
    pub fn set(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// Parse an XML part.
    pub fn read_xml(&self, name: &str) -> Result<XmlDocument> {
        let data = self
            .get(name)
            .ok_or_else(|| Error::TemplateLoad(format!("Missing part '{}'", name)))?;
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlError(format!("'{}' is not UTF-8: {}", name, e)))?;
        XmlDocument::parse(text).map_err(|e| Error::XmlError(format!("'{}': {}", name, e)))
    }

    pub fn set_xml(&mut self, name: &str, doc: &XmlDocument) {
        self.set(name, doc.to_xml().into_bytes());
    }
}

/// Path of the relationships part belonging to `part`.
pub(crate) fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that owns it.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Target of `part` relative to the directory of `source_part`, for parts
/// in the same directory or below it.
pub(crate) fn relative_target(source_part: &str, part: &str) -> String {
    match source_part.rsplit_once('/') {
        Some((dir, _)) => part
            .strip_prefix(dir)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
            .unwrap_or_else(|| format!("/{}", part)),
        None => part.to_string(),
    }
}

/// `Relationship` elements of a relationships part.
pub(crate) fn relationships(rels: &XmlDocument) -> impl Iterator<Item = &Element> {
    rels.root.children_named("Relationship")
}

/// A relationship id not yet used in `rels`.
pub(crate) fn next_relationship_id(rels: &XmlDocument) -> String {
    let max = relationships(rels)
        .filter_map(|r| r.attr("Id"))
        .filter_map(|id| id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
pub(crate) fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".rels").trim_end_matches(".xml");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("slide4.xml.rels"), Some(4));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_rels_path() {
        assert_eq!(rels_path("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels_path("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
        assert_eq!(rels_path("root.xml"), "_rels/root.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt/presentation.xml", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../slideLayouts/slideLayout2.xml"),
            "ppt/slideLayouts/slideLayout2.xml"
        );
        assert_eq!(resolve_target("ppt/presentation.xml", "/ppt/slides/slide9.xml"), "ppt/slides/slide9.xml");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(relative_target("ppt/presentation.xml", "ppt/slides/slide4.xml"), "slides/slide4.xml");
        assert_eq!(relative_target("ppt/presentation.xml", "other/x.xml"), "/other/x.xml");
    }

    #[test]
    fn test_next_relationship_id() {
        let rels = XmlDocument::parse(
            r#"<Relationships><Relationship Id="rId2"/><Relationship Id="rId10"/><Relationship Id="custom"/></Relationships>"#,
        )
        .unwrap();
        assert_eq!(next_relationship_id(&rels), "rId11");
    }

    #[test]
    fn test_write_and_read_back() {
        let mut package = Package::default();
        package.set("a.xml", b"<a/>".to_vec());
        package.set("dir/b.bin", vec![1, 2, 3]);
        package.set("a.xml", b"<a>x</a>".to_vec());

        let bytes = package.write(Cursor::new(Vec::new())).unwrap().into_inner();
        let mut read = Package::read(Cursor::new(bytes)).unwrap();

        assert_eq!(read.names().collect::<Vec<_>>(), vec!["a.xml", "dir/b.bin"]);
        assert_eq!(read.get("a.xml"), Some(&b"<a>x</a>"[..]));
        assert_eq!(read.read_xml("a.xml").unwrap().root.text(), "x");
        assert!(read.read_xml("missing.xml").is_err());

        read.remove("a.xml");
        assert!(!read.contains("a.xml"));
    }
}
