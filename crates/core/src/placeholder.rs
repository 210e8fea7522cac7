//! Placeholder tags.
//!
//! Text placeholders are `{{name}}` spans inside a paragraph's flattened
//! text. There is no escaping and no nesting: a tag runs from a `{{` to the
//! nearest `}}` after it, whatever lies in between.
//!
//! List placeholders are tables whose top-left cell names the content key
//! holding the table rows. How that cell is read is a [`ListMarkerSyntax`].

use crate::types::Document;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

/// Leftmost `{{`, then the nearest `}}` after it.
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap());

/// Number of characters the fixed-offset rule strips before the identifier.
const FIXED_OFFSET_LEADING: usize = 8;

/// Number of characters the fixed-offset rule strips after the identifier.
const FIXED_OFFSET_TRAILING: usize = 2;

/// A complete `{{...}}` tag found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Byte range of the whole tag, braces included.
    pub span: Range<usize>,

    /// The tag as written, e.g. `{{jobid}}`.
    pub tag: &'a str,

    /// Everything between the braces, untrimmed.
    pub name: &'a str,
}

/// Find every complete tag in `text`, left to right, without overlap.
///
/// A `{{` with no `}}` after it is not a tag.
pub fn scan(text: &str) -> impl Iterator<Item = Placeholder<'_>> {
    TAG_REGEX.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        Some(Placeholder {
            span: whole.range(),
            tag: whole.as_str(),
            name: name.as_str(),
        })
    })
}

/// The tag text for a content key.
pub fn tag_for(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

/// How a table's top-left cell names the list that fills the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListMarkerSyntax {
    /// The cell must be one whole tag. `{{kind:name}}` yields `name`,
    /// `{{name}}` yields `name`. Other tables are not placeholders.
    Delimited,

    /// Strip 8 leading and 2 trailing characters and trim. Every table is a
    /// placeholder; text of 10 characters or fewer yields an empty name.
    #[default]
    FixedOffset,
}

impl ListMarkerSyntax {
    /// The content key named by a table's top-left cell text, or None if the
    /// table is not a list placeholder.
    pub fn identifier(self, cell_text: &str) -> Option<String> {
        match self {
            Self::Delimited => delimited_identifier(cell_text),
            Self::FixedOffset => Some(fixed_offset_identifier(cell_text)),
        }
    }
}

impl FromStr for ListMarkerSyntax {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delimited" => Ok(Self::Delimited),
            "fixed-offset" | "fixed_offset" | "legacy" => Ok(Self::FixedOffset),
            other => Err(format!("unknown list marker syntax '{}'", other)),
        }
    }
}

fn delimited_identifier(cell_text: &str) -> Option<String> {
    let trimmed = cell_text.trim();
    let tag = scan(trimmed).next()?;
    if tag.span != (0..trimmed.len()) {
        return None;
    }

    let body = tag.name.trim();
    let name = match body.split_once(':') {
        Some((kind, name)) if is_marker_kind(kind) => name.trim(),
        _ => body,
    };
    Some(name.to_string())
}

fn is_marker_kind(kind: &str) -> bool {
    !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn fixed_offset_identifier(cell_text: &str) -> String {
    let chars: Vec<char> = cell_text.chars().collect();
    if chars.len() <= FIXED_OFFSET_LEADING + FIXED_OFFSET_TRAILING {
        return String::new();
    }
    chars[FIXED_OFFSET_LEADING..chars.len() - FIXED_OFFSET_TRAILING]
        .iter()
        .collect::<String>()
        .trim()
        .to_string()
}

/// Whether a placeholder fills text or a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderKind {
    Scalar,
    List,
}

/// A placeholder found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderUse {
    /// 1-based slide number.
    pub slide: usize,

    /// Name of the shape holding the placeholder.
    pub shape: String,

    pub kind: PlaceholderKind,

    /// Content key, trimmed.
    pub name: String,
}

/// List every placeholder in a document, in slide and shape order.
pub fn inventory(document: &Document, syntax: ListMarkerSyntax) -> Vec<PlaceholderUse> {
    let mut found = Vec::new();

    for slide in &document.slides {
        for shape in &slide.shapes {
            if let Some(frame) = &shape.text_frame {
                for paragraph in &frame.paragraphs {
                    let text = paragraph.text();
                    found.extend(scan(&text).map(|p| PlaceholderUse {
                        slide: slide.number,
                        shape: shape.name.clone(),
                        kind: PlaceholderKind::Scalar,
                        name: p.name.trim().to_string(),
                    }));
                }
            }

            let marker = shape
                .table
                .as_ref()
                .and_then(|t| t.cell(0, 0))
                .and_then(|c| syntax.identifier(&c.text()));
            if let Some(name) = marker {
                found.push(PlaceholderUse {
                    slide: slide.number,
                    shape: shape.name.clone(),
                    kind: PlaceholderKind::List,
                    name,
                });
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Shape, Slide, Table, TextFrame};

    fn names(text: &str) -> Vec<&str> {
        scan(text).map(|p| p.name).collect()
    }

    #[test]
    fn test_scan_multiple_tags() {
        let text = "Job {{jobid}} on {{jobdate}} ({{jobid}})";
        let tags: Vec<_> = scan(text).collect();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].tag, "{{jobid}}");
        assert_eq!(tags[0].span, 4..13);
        assert_eq!(names(text), vec!["jobid", "jobdate", "jobid"]);
    }

    #[test]
    fn test_scan_nearest_closing_delimiter() {
        assert_eq!(names("{{a{{b}}"), vec!["a{{b"]);
        assert_eq!(names("{{a}}}"), vec!["a"]);
        assert_eq!(names("{{}}"), vec![""]);
    }

    #[test]
    fn test_scan_unclosed_is_not_a_tag() {
        assert_eq!(scan("{{open").count(), 0);
        assert_eq!(scan("close}} then {{open").count(), 0);
    }

    #[test]
    fn test_tag_for() {
        assert_eq!(tag_for("jobid"), "{{jobid}}");
    }

    #[test]
    fn test_delimited_marker() {
        let syntax = ListMarkerSyntax::Delimited;
        assert_eq!(syntax.identifier("{{table:orders}}"), Some("orders".into()));
        assert_eq!(syntax.identifier("  {{ list: line_items }} "), Some("line_items".into()));
        assert_eq!(syntax.identifier("{{orders}}"), Some("orders".into()));
        assert_eq!(syntax.identifier("Name"), None);
        assert_eq!(syntax.identifier("{{a}} and {{b}}"), None);
        assert_eq!(syntax.identifier("prefix {{orders}}"), None);
    }

    #[test]
    fn test_fixed_offset_marker_matches_delimited_for_existing_templates() {
        let fixed = ListMarkerSyntax::FixedOffset;
        assert_eq!(fixed.identifier("{{table:orders}}"), Some("orders".into()));
        assert_eq!(
            fixed.identifier("{{table:orders}}"),
            ListMarkerSyntax::Delimited.identifier("{{table:orders}}")
        );
    }

    #[test]
    fn test_fixed_offset_marker_is_literal() {
        let fixed = ListMarkerSyntax::FixedOffset;
        assert_eq!(fixed.identifier("{{list:  items  }}"), Some("items".into()));
        assert_eq!(fixed.identifier("Name"), Some(String::new()));
        assert_eq!(fixed.identifier("0123456789"), Some(String::new()));
        assert_eq!(fixed.identifier("01234567x89"), Some("x".into()));
        assert_eq!(fixed.identifier("{{täble:ørders}}"), Some("ørders".into()));
    }

    #[test]
    fn test_default_marker_syntax_is_fixed_offset() {
        let syntax = ListMarkerSyntax::default();
        assert_eq!(syntax, ListMarkerSyntax::FixedOffset);
        assert_eq!(syntax.identifier("{{{ orders }}}"), Some("ers".into()));
        assert_eq!(syntax.identifier("Name"), Some(String::new()));
    }

    #[test]
    fn test_marker_syntax_from_str() {
        assert_eq!(
            "delimited".parse::<ListMarkerSyntax>(),
            Ok(ListMarkerSyntax::Delimited)
        );
        assert_eq!(
            "Fixed-Offset".parse::<ListMarkerSyntax>(),
            Ok(ListMarkerSyntax::FixedOffset)
        );
        assert_eq!(
            "legacy".parse::<ListMarkerSyntax>(),
            Ok(ListMarkerSyntax::FixedOffset)
        );
        assert!("other".parse::<ListMarkerSyntax>().is_err());
    }

    #[test]
    fn test_inventory() {
        let mut slide = Slide::new(1, 0);
        slide.add_shape(
            Shape::new(2, "Title 1").with_text_frame(TextFrame::with_text("Job {{jobid}} {{ client }}")),
        );
        let mut table = Table::new(1, 1, 100, 100);
        table.cell_mut(0, 0).unwrap().set_text("{{table:orders}}");
        slide.add_shape(Shape::new(3, "Table 2").with_table(table));
        slide.add_shape(Shape::new(4, "Table 3").with_table(Table::new(1, 1, 100, 100)));

        let mut doc = Document::new();
        doc.add_slide(slide);

        let found = inventory(&doc, ListMarkerSyntax::Delimited);
        let summary: Vec<_> = found.iter().map(|p| (p.kind, p.name.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (PlaceholderKind::Scalar, "jobid"),
                (PlaceholderKind::Scalar, "client"),
                (PlaceholderKind::List, "orders"),
            ]
        );
        assert_eq!(found[2].shape, "Table 2");
    }
}
