//! Slide XML to document model.

use crate::xml::Element;
use deckgen_core::{
    Error, FontSize, Geometry, Paragraph, Result, RunFormat, Shape, Slide, Table, TableCell,
    TableRow, TextFrame, TextRun,
};

/// `p:spTree` children that are not shapes.
const TREE_PROPERTIES: &[&str] = &["nvGrpSpPr", "grpSpPr", "extLst"];

/// The shape tree of a slide (`p:sld/p:cSld/p:spTree`).
pub(crate) fn shape_tree(root: &Element) -> Result<&Element> {
    root.find(&["cSld", "spTree"])
        .ok_or_else(|| Error::TemplateLoad("slide has no shape tree".to_string()))
}

/// Whether a `p:spTree` child holds a shape.
pub(crate) fn is_shape_slot(element: &Element) -> bool {
    !TREE_PROPERTIES.contains(&element.local_name())
}

/// Build the model of one slide. Shape origins are positions among the
/// shape tree's shape slots.
pub(crate) fn parse_slide(root: &Element, number: usize, origin: usize) -> Result<Slide> {
    let tree = shape_tree(root)?;
    let mut slide = Slide::new(number, origin);

    for (slot, element) in tree.elements().filter(|e| is_shape_slot(e)).enumerate() {
        let shape = parse_shape(element, slot);
        log::debug!(
            "Slide {}: shape {} '{}' (text: {}, table: {})",
            number,
            shape.id,
            shape.name,
            shape.has_text_frame(),
            shape.has_table()
        );
        slide.add_shape(shape);
    }

    Ok(slide)
}

fn parse_shape(element: &Element, slot: usize) -> Shape {
    let (id, name) = element
        .descendant("cNvPr")
        .map(|c| {
            let id = c.attr("id").and_then(|v| v.parse().ok()).unwrap_or(0);
            let name = c.attr("name").unwrap_or_default().to_string();
            (id, name)
        })
        .unwrap_or_default();

    let mut shape = Shape::new(id, name).with_origin(slot);

    match element.local_name() {
        "sp" => {
            if let Some(geometry) = element.find(&["spPr", "xfrm"]).and_then(parse_geometry) {
                shape = shape.with_geometry(geometry);
            }
            if let Some(body) = element.child("txBody") {
                shape = shape.with_text_frame(parse_text_body(body));
            }
        }
        "graphicFrame" => {
            if let Some(geometry) = element.child("xfrm").and_then(parse_geometry) {
                shape = shape.with_geometry(geometry);
            }
            if let Some(tbl) = element.find(&["graphic", "graphicData", "tbl"]) {
                shape = shape.with_table(parse_table(tbl));
            }
        }
        _ => {}
    }

    shape
}

fn parse_geometry(xfrm: &Element) -> Option<Geometry> {
    let off = xfrm.child("off")?;
    let ext = xfrm.child("ext")?;
    Some(Geometry::new(
        parse_emu(off.attr("x")?)?,
        parse_emu(off.attr("y")?)?,
        parse_emu(ext.attr("cx")?)?,
        parse_emu(ext.attr("cy")?)?,
    ))
}

fn parse_emu(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

/// Build a text frame from an `a:txBody` (or `p:txBody`) element.
pub(crate) fn parse_text_body(body: &Element) -> TextFrame {
    TextFrame {
        paragraphs: body.children_named("p").map(parse_paragraph).collect(),
    }
}

fn parse_paragraph(p: &Element) -> Paragraph {
    Paragraph {
        runs: p
            .children_named("r")
            .map(|r| TextRun {
                text: r.child("t").map(Element::text).unwrap_or_default(),
                format: parse_run_format(r.child("rPr")),
            })
            .collect(),
        default_format: parse_run_format(p.find(&["pPr", "defRPr"])),
    }
}

/// Read `sz` and `b` from a run properties element.
pub(crate) fn parse_run_format(properties: Option<&Element>) -> RunFormat {
    let Some(properties) = properties else {
        return RunFormat::default();
    };
    RunFormat {
        size: properties
            .attr("sz")
            .and_then(|v| v.trim().parse().ok())
            .map(FontSize),
        bold: properties.attr("b").map(|v| v == "1" || v == "true"),
    }
}

fn parse_table(tbl: &Element) -> Table {
    let columns = tbl
        .child("tblGrid")
        .map(|grid| {
            grid.children_named("gridCol")
                .map(|c| c.attr("w").and_then(parse_emu).unwrap_or(0))
                .collect()
        })
        .unwrap_or_default();

    let rows = tbl
        .children_named("tr")
        .map(|tr| TableRow {
            height: tr.attr("h").and_then(parse_emu).unwrap_or(0),
            cells: tr
                .children_named("tc")
                .map(|tc| TableCell {
                    text_frame: tc.child("txBody").map(parse_text_body).unwrap_or_default(),
                })
                .collect(),
        })
        .collect();

    Table { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    const SLIDE: &str = r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr/>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
<p:spPr><a:xfrm><a:off x="457200" y="274638"/><a:ext cx="8229600" cy="1143000"/></a:xfrm></p:spPr>
<p:txBody><a:bodyPr/><a:lstStyle/>
<a:p><a:pPr><a:defRPr sz="2400"/></a:pPr><a:r><a:rPr lang="en-US" sz="3200" b="1"/><a:t>Job {{job</a:t></a:r><a:r><a:rPr lang="en-US"/><a:t>id}}</a:t></a:r></a:p>
<a:p><a:endParaRPr lang="en-US"/></a:p>
</p:txBody></p:sp>
<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="4" name="Table 3"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>
<p:xfrm><a:off x="100" y="200"/><a:ext cx="3000" cy="400"/></p:xfrm>
<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr/><a:tblGrid><a:gridCol w="3000"/></a:tblGrid>
<a:tr h="400"><a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr sz="1800"/><a:t>{{table:orders}}</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc></a:tr>
</a:tbl></a:graphicData></a:graphic></p:graphicFrame>
<p:pic><p:nvPicPr><p:cNvPr id="5" name="Logo"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr></p:pic>
</p:spTree></p:cSld></p:sld>"#;

    fn slide() -> Slide {
        let doc = XmlDocument::parse(SLIDE).unwrap();
        parse_slide(&doc.root, 1, 0).unwrap()
    }

    #[test]
    fn test_parse_shapes_in_order() {
        let slide = slide();
        let summary: Vec<_> = slide
            .shapes
            .iter()
            .map(|s| (s.id, s.name.as_str(), s.origin(), s.has_text_frame(), s.has_table()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (2, "Title 1", Some(0), true, false),
                (4, "Table 3", Some(1), false, true),
                (5, "Logo", Some(2), false, false),
            ]
        );
    }

    #[test]
    fn test_parse_text_body() {
        let slide = slide();
        let frame = slide.shapes[0].text_frame.as_ref().unwrap();
        assert_eq!(frame.paragraphs.len(), 2);

        let first = &frame.paragraphs[0];
        assert_eq!(first.text(), "Job {{jobid}}");
        assert_eq!(first.runs.len(), 2);
        assert_eq!(
            first.runs[0].format,
            RunFormat {
                size: Some(FontSize(3200)),
                bold: Some(true)
            }
        );
        assert_eq!(first.runs[1].format, RunFormat::default());
        assert_eq!(first.default_format.size, Some(FontSize(2400)));
        assert!(frame.paragraphs[1].runs.is_empty());

        assert_eq!(
            slide.shapes[0].geometry,
            Some(Geometry::new(457200, 274638, 8229600, 1143000))
        );
    }

    #[test]
    fn test_parse_table() {
        let slide = slide();
        let shape = &slide.shapes[1];
        assert_eq!(shape.geometry, Some(Geometry::new(100, 200, 3000, 400)));

        let table = shape.table.as_ref().unwrap();
        assert_eq!(table.columns, vec![3000]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].height, 400);
        let cell = table.cell(0, 0).unwrap();
        assert_eq!(cell.text(), "{{table:orders}}");
        assert_eq!(cell.text_frame.paragraphs[0].runs[0].format.size, Some(FontSize(1800)));
    }

    #[test]
    fn test_slide_without_tree_is_an_error() {
        let doc = XmlDocument::parse("<p:sld><p:cSld/></p:sld>").unwrap();
        assert!(matches!(parse_slide(&doc.root, 1, 0), Err(Error::TemplateLoad(_))));
    }

    #[test]
    fn test_parse_run_format_bold_values() {
        let doc = XmlDocument::parse(r#"<a:rPr b="0"/>"#).unwrap();
        assert_eq!(parse_run_format(Some(&doc.root)).bold, Some(false));
        let doc = XmlDocument::parse(r#"<a:rPr b="true" sz="x"/>"#).unwrap();
        let format = parse_run_format(Some(&doc.root));
        assert_eq!(format.bold, Some(true));
        assert_eq!(format.size, None);
    }
}
