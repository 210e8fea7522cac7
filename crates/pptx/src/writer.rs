//! Document model back to package parts.
//!
//! Slides are written by patching the template slide they came from. Shapes
//! that still have a template origin keep all of their XML and only get the
//! model's text, run size and weight, geometry and table cells written into
//! it. New table shapes are emitted as complete graphic frames.

use crate::package::{
    next_relationship_id, relationships, rels_path, relative_target, resolve_target, Package,
    CONTENT_TYPES, CT_SLIDE, REL_NOTES_SLIDE_SUFFIX, REL_SLIDE,
};
use crate::parser::is_shape_slot;
use crate::template::{
    max_slide_part_number, relationship_key, PptxTemplate, SlidePart, PRESENTATION,
};
use crate::xml::{qualified, Element, Node, XmlDocument, NS_DRAWINGML, NS_PRESENTATIONML};
use deckgen_core::{
    Document, Error, Geometry, Paragraph, Result, RunFormat, Shape, Slide, Table, TableRow,
    TextFrame, TextRun,
};
use std::collections::HashSet;

const TABLE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

/// "Medium Style 2 - Accent 1", the default style of inserted tables.
const TABLE_STYLE_ID: &str = "{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}";

/// Smallest valid `p:sldId/@id`.
const MIN_SLIDE_ID: u32 = 256;

/// Build the output package for `document`.
pub(crate) fn write(template: &PptxTemplate, document: &Document) -> Result<Package> {
    let mut package = template.package.clone();
    let mut presentation = template.presentation.clone();
    let mut presentation_rels = template.presentation_rels.clone();
    let mut content_types = template.content_types.clone();

    let mut claimed = vec![false; template.slides.len()];
    let mut slide_ids = Vec::with_capacity(document.slides.len());
    let mut next_part = max_slide_part_number(&package) + 1;
    let mut next_slide_id = template
        .slides
        .iter()
        .filter_map(|s| s.slide_id.attr("id").and_then(|id| id.parse::<u32>().ok()))
        .max()
        .map_or(MIN_SLIDE_ID, |id| id + 1);

    for slide in &document.slides {
        let part = template.slides.get(slide.origin).ok_or_else(|| {
            Error::InvalidDocument(format!(
                "slide {} comes from template slide {}, but the template has {}",
                slide.number,
                slide.origin + 1,
                template.slides.len()
            ))
        })?;
        let xml = patch_slide(&part.xml, slide)?;

        if !claimed[slide.origin] {
            claimed[slide.origin] = true;
            package.set_xml(&part.path, &xml);
            slide_ids.push(part.slide_id.clone());
            continue;
        }

        let path = format!("ppt/slides/slide{}.xml", next_part);
        next_part += 1;
        copy_slide_relationships(&mut package, &part.path, &path)?;
        package.set_xml(&path, &xml);
        add_override(&mut content_types, &path, CT_SLIDE);

        let rel_id = next_relationship_id(&presentation_rels);
        let relationship = Element::new(qualified(
            presentation_rels.root.prefix().unwrap_or_default(),
            "Relationship",
        ))
        .with_attr("Id", rel_id.as_str())
        .with_attr("Type", REL_SLIDE)
        .with_attr("Target", relative_target(PRESENTATION, &path));
        presentation_rels.root.children.push(Node::Element(relationship));

        let mut slide_id = part.slide_id.clone();
        slide_id.set_attr("id", next_slide_id.to_string());
        next_slide_id += 1;
        if let Some(key) = relationship_key(&part.slide_id) {
            slide_id.set_attr(key, rel_id.as_str());
        }
        slide_ids.push(slide_id);

        log::debug!("Slide {} copied from {} to {}", slide.number, part.path, path);
    }

    for (part, _) in template.slides.iter().zip(&claimed).filter(|(_, c)| !**c) {
        remove_slide(
            &mut package,
            &mut presentation_rels,
            &mut content_types,
            part,
        )?;
    }

    if let Some(list) = presentation.root.child_mut("sldIdLst") {
        list.children = slide_ids.into_iter().map(Node::Element).collect();
    }

    package.set_xml(PRESENTATION, &presentation);
    package.set_xml(&rels_path(PRESENTATION), &presentation_rels);
    package.set_xml(CONTENT_TYPES, &content_types);

    log::debug!("Wrote {} slide(s)", document.slides.len());
    Ok(package)
}

/// Give a copied slide its own relationships part. Notes stay with the
/// original slide.
fn copy_slide_relationships(package: &mut Package, from: &str, to: &str) -> Result<()> {
    let source = rels_path(from);
    if !package.contains(&source) {
        return Ok(());
    }
    let mut rels = package.read_xml(&source)?;
    rels.root.children.retain(|node| match node {
        Node::Element(e) => !is_notes_relationship(e),
        _ => true,
    });
    package.set_xml(&rels_path(to), &rels);
    Ok(())
}

/// Drop a template slide that no output slide claims, with its notes.
fn remove_slide(
    package: &mut Package,
    presentation_rels: &mut XmlDocument,
    content_types: &mut XmlDocument,
    part: &SlidePart,
) -> Result<()> {
    let slide_rels = rels_path(&part.path);
    if package.contains(&slide_rels) {
        let rels = package.read_xml(&slide_rels)?;
        let notes: Vec<String> = relationships(&rels)
            .filter(|r| is_notes_relationship(r))
            .filter_map(|r| r.attr("Target"))
            .map(|target| resolve_target(&part.path, target))
            .collect();
        for note in notes {
            remove_part(package, content_types, &note);
        }
    }

    presentation_rels.root.children.retain(|node| match node {
        Node::Element(e) => e.attr("Id") != Some(part.rel_id.as_str()),
        _ => true,
    });
    remove_part(package, content_types, &part.path);

    log::debug!("Dropped unused template slide {}", part.path);
    Ok(())
}

fn remove_part(package: &mut Package, content_types: &mut XmlDocument, path: &str) {
    package.remove(path);
    package.remove(&rels_path(path));
    let part_name = format!("/{}", path);
    content_types.root.children.retain(|node| match node {
        Node::Element(e) => !(e.local_name() == "Override" && e.attr("PartName") == Some(part_name.as_str())),
        _ => true,
    });
}

fn add_override(content_types: &mut XmlDocument, path: &str, content_type: &str) {
    let element = Element::new(qualified(
        content_types.root.prefix().unwrap_or_default(),
        "Override",
    ))
    .with_attr("PartName", format!("/{}", path))
    .with_attr("ContentType", content_type);
    content_types.root.children.push(Node::Element(element));
}

fn is_notes_relationship(relationship: &Element) -> bool {
    relationship
        .attr("Type")
        .is_some_and(|t| t.ends_with(REL_NOTES_SLIDE_SUFFIX))
}

/// Apply a slide model to a copy of its template slide.
fn patch_slide(template: &XmlDocument, slide: &Slide) -> Result<XmlDocument> {
    let mut xml = template.clone();
    let a = xml.prefix_for(NS_DRAWINGML).unwrap_or("a").to_string();
    let p = xml.prefix_for(NS_PRESENTATIONML).unwrap_or("p").to_string();

    let tree = xml.root.find_mut(&["cSld", "spTree"]).ok_or_else(|| {
        Error::InvalidDocument(format!("slide {} has no shape tree", slide.number))
    })?;

    let mut children = Vec::new();
    let mut tail = Vec::new();
    let mut slots = Vec::new();
    for node in std::mem::take(&mut tree.children) {
        match node {
            Node::Element(e) if is_shape_slot(&e) => slots.push(Some(e)),
            Node::Element(e) if e.local_name() == "extLst" => tail.push(Node::Element(e)),
            Node::Element(e) => children.push(Node::Element(e)),
            Node::Text(_) | Node::Raw(_) => {}
        }
    }

    // Template shapes first, so new shapes can avoid the ids they keep.
    let mut placed = Vec::with_capacity(slide.shapes.len());
    for shape in &slide.shapes {
        let Some(slot) = shape.origin() else {
            if shape.table.is_none() {
                return Err(Error::InvalidDocument(format!(
                    "slide {}: new shape '{}' has no table",
                    slide.number, shape.name
                )));
            }
            placed.push(None);
            continue;
        };
        let mut element = slots.get_mut(slot).and_then(Option::take).ok_or_else(|| {
            Error::InvalidDocument(format!(
                "slide {}: shape '{}' refers to a missing or already used template shape",
                slide.number, shape.name
            ))
        })?;
        patch_shape(&mut element, shape, &a);
        placed.push(Some(element));
    }

    let mut used_ids = HashSet::new();
    let properties = children.iter().filter_map(|n| match n {
        Node::Element(e) => Some(e),
        _ => None,
    });
    for element in properties.chain(placed.iter().flatten()) {
        element.walk(&mut |e| {
            if e.local_name() == "cNvPr" {
                if let Some(id) = e.attr("id").and_then(|v| v.parse::<u32>().ok()) {
                    used_ids.insert(id);
                }
            }
        });
    }

    for (shape, element) in slide.shapes.iter().zip(placed) {
        let element = match (element, &shape.table) {
            (Some(element), _) => element,
            (None, Some(table)) => {
                let id = if used_ids.contains(&shape.id) {
                    used_ids.iter().max().copied().unwrap_or(1) + 1
                } else {
                    shape.id
                };
                used_ids.insert(id);
                table_frame(shape, id, table, &a, &p)
            }
            (None, None) => continue,
        };
        children.push(Node::Element(element));
    }

    children.extend(tail);
    tree.children = children;
    Ok(xml)
}

fn patch_shape(element: &mut Element, shape: &Shape, a: &str) {
    match element.local_name() {
        "sp" => {
            if let (Some(geometry), Some(xfrm)) = (shape.geometry, element.find_mut(&["spPr", "xfrm"])) {
                write_geometry(xfrm, geometry, a);
            }
            if let (Some(frame), Some(body)) = (&shape.text_frame, element.child_mut("txBody")) {
                patch_text_body(body, frame, a);
            }
        }
        "graphicFrame" => {
            if let (Some(geometry), Some(xfrm)) = (shape.geometry, element.child_mut("xfrm")) {
                write_geometry(xfrm, geometry, a);
            }
            if let (Some(table), Some(tbl)) = (
                &shape.table,
                element.find_mut(&["graphic", "graphicData", "tbl"]),
            ) {
                patch_table(tbl, table, a);
            }
        }
        _ => {}
    }
}

fn write_geometry(xfrm: &mut Element, geometry: Geometry, a: &str) {
    let off = xfrm.ensure_child("off", 0, || Element::new(qualified(a, "off")));
    off.set_attr("x", geometry.left.to_string());
    off.set_attr("y", geometry.top.to_string());
    let ext = xfrm.ensure_child("ext", 1, || Element::new(qualified(a, "ext")));
    ext.set_attr("cx", geometry.width.to_string());
    ext.set_attr("cy", geometry.height.to_string());
}

/// Make a text body's paragraphs match the frame.
fn patch_text_body(body: &mut Element, frame: &TextFrame, a: &str) {
    let positions = body.positions("p");
    for (idx, paragraph) in frame.paragraphs.iter().enumerate() {
        match positions.get(idx) {
            Some(&pos) => {
                if let Some(p) = body.element_at_mut(pos) {
                    patch_paragraph(p, paragraph, a);
                }
            }
            None => body.children.push(Node::Element(new_paragraph(paragraph, a))),
        }
    }
    for &pos in positions.iter().skip(frame.paragraphs.len()).rev() {
        body.children.remove(pos);
    }
    // A text body needs at least one paragraph.
    if body.positions("p").is_empty() {
        body.children.push(Node::Element(Element::new(qualified(a, "p"))));
    }
}

fn patch_paragraph(p: &mut Element, paragraph: &Paragraph, a: &str) {
    if let Some(defaults) = p.find_mut(&["pPr", "defRPr"]) {
        apply_format(defaults, paragraph.default_format);
    }

    let positions = p.positions("r");
    for (idx, run) in paragraph.runs.iter().enumerate() {
        match positions.get(idx) {
            Some(&pos) => {
                if let Some(r) = p.element_at_mut(pos) {
                    patch_run(r, run, a);
                }
            }
            None => {
                let at = p
                    .positions("endParaRPr")
                    .first()
                    .copied()
                    .unwrap_or(p.children.len());
                p.children.insert(at, Node::Element(new_run(run, a)));
            }
        }
    }
    for &pos in positions.iter().skip(paragraph.runs.len()).rev() {
        p.children.remove(pos);
    }
}

fn patch_run(r: &mut Element, run: &TextRun, a: &str) {
    if run.format != RunFormat::default() || r.child("rPr").is_some() {
        let properties = r.ensure_child("rPr", 0, || Element::new(qualified(a, "rPr")));
        apply_format(properties, run.format);
    }
    r.ensure_child("t", usize::MAX, || Element::new(qualified(a, "t")))
        .set_text(run.text.as_str());
}

/// Write the model's size and weight. Unset fields remove the attribute so
/// the value is inherited again.
fn apply_format(properties: &mut Element, format: RunFormat) {
    match format.size {
        Some(size) => properties.set_attr("sz", size.0.to_string()),
        None => properties.remove_attr("sz"),
    }
    match format.bold {
        Some(bold) => properties.set_attr("b", if bold { "1" } else { "0" }),
        None => properties.remove_attr("b"),
    }
}

fn new_paragraph(paragraph: &Paragraph, a: &str) -> Element {
    let mut p = Element::new(qualified(a, "p"));
    if paragraph.default_format != RunFormat::default() {
        let mut defaults = Element::new(qualified(a, "defRPr"));
        apply_format(&mut defaults, paragraph.default_format);
        p = p.with_child(Element::new(qualified(a, "pPr")).with_child(defaults));
    }
    for run in &paragraph.runs {
        p = p.with_child(new_run(run, a));
    }
    p
}

fn new_run(run: &TextRun, a: &str) -> Element {
    let mut properties = Element::new(qualified(a, "rPr")).with_attr("lang", "en-US");
    apply_format(&mut properties, run.format);
    let mut text = Element::new(qualified(a, "t"));
    text.set_text(run.text.as_str());
    Element::new(qualified(a, "r"))
        .with_child(properties)
        .with_child(text)
}

/// Write a table model into an existing `a:tbl`. Cells are patched in place
/// when the grid has the same shape; otherwise the grid and rows are
/// replaced.
fn patch_table(tbl: &mut Element, table: &Table, a: &str) {
    let same_shape = tbl
        .child("tblGrid")
        .map(|grid| grid.children_named("gridCol").count())
        == Some(table.columns.len())
        && tbl.children_named("tr").count() == table.rows.len()
        && tbl
            .children_named("tr")
            .zip(&table.rows)
            .all(|(tr, row)| tr.children_named("tc").count() == row.cells.len());

    if !same_shape {
        replace_rows(tbl, table, a);
        return;
    }

    if let Some(grid) = tbl.child_mut("tblGrid") {
        for (pos, width) in grid.positions("gridCol").into_iter().zip(&table.columns) {
            if let Some(column) = grid.element_at_mut(pos) {
                column.set_attr("w", width.to_string());
            }
        }
    }

    for (pos, row) in tbl.positions("tr").into_iter().zip(&table.rows) {
        let Some(tr) = tbl.element_at_mut(pos) else {
            continue;
        };
        tr.set_attr("h", row.height.to_string());
        for (pos, cell) in tr.positions("tc").into_iter().zip(&row.cells) {
            if let Some(tc) = tr.element_at_mut(pos) {
                let body = tc.ensure_child("txBody", 0, || empty_text_body(a));
                patch_text_body(body, &cell.text_frame, a);
            }
        }
    }
}

/// Replace the grid and all rows of an `a:tbl`, keeping `a:tblPr`.
fn replace_rows(tbl: &mut Element, table: &Table, a: &str) {
    tbl.children.retain(|node| match node {
        Node::Element(e) => !matches!(e.local_name(), "tblGrid" | "tr"),
        _ => true,
    });

    let grid = table.columns.iter().fold(
        Element::new(qualified(a, "tblGrid")),
        |grid, width| {
            grid.with_child(Element::new(qualified(a, "gridCol")).with_attr("w", width.to_string()))
        },
    );

    let at = tbl.positions("tblPr").first().map_or(0, |pos| pos + 1);
    let nodes = std::iter::once(grid)
        .chain(table.rows.iter().map(|row| new_row(row, a)))
        .map(Node::Element);
    tbl.children.splice(at..at, nodes);
}

fn new_row(row: &TableRow, a: &str) -> Element {
    row.cells.iter().fold(
        Element::new(qualified(a, "tr")).with_attr("h", row.height.to_string()),
        |tr, cell| {
            let mut body = empty_text_body(a);
            patch_text_body(&mut body, &cell.text_frame, a);
            tr.with_child(
                Element::new(qualified(a, "tc"))
                    .with_child(body)
                    .with_child(Element::new(qualified(a, "tcPr"))),
            )
        },
    )
}

fn empty_text_body(a: &str) -> Element {
    Element::new(qualified(a, "txBody"))
        .with_child(Element::new(qualified(a, "bodyPr")))
        .with_child(Element::new(qualified(a, "lstStyle")))
}

/// A complete `p:graphicFrame` for a table created after loading.
fn table_frame(shape: &Shape, id: u32, table: &Table, a: &str, p: &str) -> Element {
    let properties = Element::new(qualified(p, "nvGraphicFramePr"))
        .with_child(
            Element::new(qualified(p, "cNvPr"))
                .with_attr("id", id.to_string())
                .with_attr("name", shape.name.as_str()),
        )
        .with_child(
            Element::new(qualified(p, "cNvGraphicFramePr")).with_child(
                Element::new(qualified(a, "graphicFrameLocks")).with_attr("noGrp", "1"),
            ),
        )
        .with_child(Element::new(qualified(p, "nvPr")));

    let mut xfrm = Element::new(qualified(p, "xfrm"));
    write_geometry(&mut xfrm, shape.geometry.unwrap_or_default(), a);

    let mut style = Element::new(qualified(a, "tableStyleId"));
    style.set_text(TABLE_STYLE_ID);
    let mut tbl = Element::new(qualified(a, "tbl")).with_child(
        Element::new(qualified(a, "tblPr"))
            .with_attr("firstRow", "1")
            .with_attr("bandRow", "1")
            .with_child(style),
    );
    replace_rows(&mut tbl, table, a);

    Element::new(qualified(p, "graphicFrame"))
        .with_child(properties)
        .with_child(xfrm)
        .with_child(
            Element::new(qualified(a, "graphic")).with_child(
                Element::new(qualified(a, "graphicData"))
                    .with_attr("uri", TABLE_URI)
                    .with_child(tbl),
            ),
        )
}
