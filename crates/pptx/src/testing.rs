//! In-memory PPTX fixtures for tests.
//!
//! The packages hold what the loader and writer need: content types,
//! presentation part and relationships, slides with a layout relationship,
//! a theme and optional notes slides. They are not meant to open in an
//! office suite.

use crate::package::Package;
use quick_xml::escape::escape;
use std::io::Cursor;

const NAMESPACES: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_BASE: &str = "application/vnd.openxmlformats-officedocument";

/// Start a package with the given slide parts, in order.
pub fn package(slides: &[String]) -> PackageBuilder {
    PackageBuilder {
        slides: slides.to_vec(),
        reversed: false,
        notes: Vec::new(),
    }
}

/// Builder for a fixture package.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    slides: Vec<String>,
    reversed: bool,
    notes: Vec<usize>,
}

impl PackageBuilder {
    /// List slides in `p:sldIdLst` last part first.
    pub fn reversed_slide_order(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Attach a notes slide to the slide part with this 1-based number.
    pub fn with_notes(mut self, slide: usize) -> Self {
        self.notes.push(slide);
        self
    }

    /// Serialize the package.
    pub fn build(&self) -> Vec<u8> {
        let mut package = Package::default();
        package.set("[Content_Types].xml", self.content_types().into_bytes());
        package.set("_rels/.rels", root_rels().into_bytes());
        package.set("ppt/presentation.xml", self.presentation().into_bytes());
        package.set(
            "ppt/_rels/presentation.xml.rels",
            self.presentation_rels().into_bytes(),
        );
        package.set(
            "ppt/theme/theme1.xml",
            format!(r#"{}<a:theme {} name="Office"/>"#, DECLARATION, NAMESPACES).into_bytes(),
        );
        package.set(
            "ppt/slideLayouts/slideLayout1.xml",
            format!(
                r#"{}<p:sldLayout {}><p:cSld name="Title"><p:spTree/></p:cSld></p:sldLayout>"#,
                DECLARATION, NAMESPACES
            )
            .into_bytes(),
        );

        for (idx, slide) in self.slides.iter().enumerate() {
            let number = idx + 1;
            package.set(&format!("ppt/slides/slide{}.xml", number), slide.clone().into_bytes());
            package.set(
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                self.slide_rels(number).into_bytes(),
            );
        }

        for (idx, &slide) in self.notes.iter().enumerate() {
            let number = idx + 1;
            package.set(
                &format!("ppt/notesSlides/notesSlide{}.xml", number),
                format!(
                    r#"{}<p:notes {}><p:cSld><p:spTree/></p:cSld></p:notes>"#,
                    DECLARATION, NAMESPACES
                )
                .into_bytes(),
            );
            package.set(
                &format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", number),
                rels(&[(
                    "rId1".to_string(),
                    format!("{}/slide", REL_BASE),
                    format!("../slides/slide{}.xml", slide),
                )])
                .into_bytes(),
            );
        }

        package
            .write(Cursor::new(Vec::new()))
            .expect("fixture package serializes")
            .into_inner()
    }

    fn content_types(&self) -> String {
        let mut overrides = vec![
            (
                "/ppt/presentation.xml".to_string(),
                format!("{}.presentationml.presentation.main+xml", CT_BASE),
            ),
            (
                "/ppt/theme/theme1.xml".to_string(),
                format!("{}.theme+xml", CT_BASE),
            ),
            (
                "/ppt/slideLayouts/slideLayout1.xml".to_string(),
                format!("{}.presentationml.slideLayout+xml", CT_BASE),
            ),
        ];
        for number in 1..=self.slides.len() {
            overrides.push((
                format!("/ppt/slides/slide{}.xml", number),
                format!("{}.presentationml.slide+xml", CT_BASE),
            ));
        }
        for number in 1..=self.notes.len() {
            overrides.push((
                format!("/ppt/notesSlides/notesSlide{}.xml", number),
                format!("{}.presentationml.notesSlide+xml", CT_BASE),
            ));
        }

        let mut xml = format!(
            r#"{}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
            DECLARATION
        );
        for (part, content_type) in overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                part, content_type
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn presentation(&self) -> String {
        let mut numbers: Vec<usize> = (1..=self.slides.len()).collect();
        if self.reversed {
            numbers.reverse();
        }
        let ids: String = numbers
            .iter()
            .enumerate()
            .map(|(idx, number)| {
                format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + idx, number + 1)
            })
            .collect();

        format!(
            r#"{}<p:presentation {}><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            DECLARATION, NAMESPACES, ids
        )
    }

    fn presentation_rels(&self) -> String {
        let mut entries = vec![(
            "rId1".to_string(),
            format!("{}/theme", REL_BASE),
            "theme/theme1.xml".to_string(),
        )];
        for number in 1..=self.slides.len() {
            entries.push((
                format!("rId{}", number + 1),
                format!("{}/slide", REL_BASE),
                format!("slides/slide{}.xml", number),
            ));
        }
        rels(&entries)
    }

    fn slide_rels(&self, number: usize) -> String {
        let mut entries = vec![(
            "rId1".to_string(),
            format!("{}/slideLayout", REL_BASE),
            "../slideLayouts/slideLayout1.xml".to_string(),
        )];
        if let Some(idx) = self.notes.iter().position(|&n| n == number) {
            entries.push((
                "rId2".to_string(),
                format!("{}/notesSlide", REL_BASE),
                format!("../notesSlides/notesSlide{}.xml", idx + 1),
            ));
        }
        rels(&entries)
    }
}

fn root_rels() -> String {
    rels(&[(
        "rId1".to_string(),
        format!("{}/officeDocument", REL_BASE),
        "ppt/presentation.xml".to_string(),
    )])
}

fn rels(entries: &[(String, String, String)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
                id, kind, target
            )
        })
        .collect();
    format!(
        r#"{}<Relationships xmlns="{}">{}</Relationships>"#,
        DECLARATION, RELS_NS, body
    )
}

/// A slide part holding the given shape elements.
pub fn slide_xml(shapes: &[String]) -> String {
    format!(
        r#"{}<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        DECLARATION,
        NAMESPACES,
        shapes.concat()
    )
}

/// A text box. Lines of `text` become paragraphs with one run each.
pub fn text_shape(id: u32, name: &str, text: &str) -> String {
    let paragraphs: String = text
        .split('\n')
        .map(|line| {
            format!(
                r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                escape(line)
            )
        })
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="274638"/><a:ext cx="8229600" cy="1143000"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>"#,
        id,
        escape(name),
        paragraphs
    )
}

/// A table frame. Every run is bold at 18pt.
pub fn table_shape(id: u32, name: &str, rows: &[&[&str]]) -> String {
    let columns = rows.first().map_or(1, |r| r.len().max(1));
    let width = 8229600 / columns;
    let grid: String = (0..columns)
        .map(|_| format!(r#"<a:gridCol w="{}"/>"#, width))
        .collect();
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|text| {
                    format!(
                        r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US" sz="1800" b="1"/><a:t>{}</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>"#,
                        escape(*text)
                    )
                })
                .collect();
            format!(r#"<a:tr h="370840">{}</a:tr>"#, cells)
        })
        .collect();

    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{}" name="{}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="457200" y="1600200"/><a:ext cx="8229600" cy="{}"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{}</a:tblGrid>{}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        id,
        escape(name),
        370840 * rows.len().max(1),
        grid,
        body
    )
}
