//! Document walker: applies record content to every slide.

use crate::content::Content;
use crate::placeholder::ListMarkerSyntax;
use crate::table::{TableOutcome, TableRebuilder, TABLE_FONT_SIZE};
use crate::text::substitute_frame;
use crate::types::{Document, FontSize};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How several records share one output document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordMode {
    /// Every record walks the same live document. Placeholders filled by an
    /// earlier record are plain text for later ones.
    #[default]
    Cumulative,

    /// Every record fills a fresh copy of the template slides; the copies
    /// are appended in record order.
    PerRecord,
}

impl FromStr for RecordMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cumulative" => Ok(Self::Cumulative),
            "per-record" | "per_record" => Ok(Self::PerRecord),
            other => Err(format!("unknown record mode '{}'", other)),
        }
    }
}

/// Rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub record_mode: RecordMode,
    pub marker_syntax: ListMarkerSyntax,
    pub table_font_size: FontSize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            record_mode: RecordMode::default(),
            marker_syntax: ListMarkerSyntax::default(),
            table_font_size: TABLE_FONT_SIZE,
        }
    }
}

/// Counts of what a rendering pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    pub records: usize,
    pub paragraphs: usize,
    pub tables_rebuilt: usize,
    pub tables_collapsed: usize,
}

impl RenderReport {
    fn merge(&mut self, other: RenderReport) {
        self.records += other.records;
        self.paragraphs += other.paragraphs;
        self.tables_rebuilt += other.tables_rebuilt;
        self.tables_collapsed += other.tables_collapsed;
    }
}

/// Fills a template document from record content.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
    tables: TableRebuilder,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            tables: TableRebuilder::new()
                .with_syntax(options.marker_syntax)
                .with_font_size(options.table_font_size),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render all records against a template, returning the output document.
    ///
    /// With no records the output is an untouched copy of the template.
    pub fn render(&self, template: &Document, contents: &[Content]) -> (Document, RenderReport) {
        let mut report = RenderReport::default();

        let document = match self.options.record_mode {
            RecordMode::Cumulative => {
                let mut document = template.clone();
                for content in contents {
                    report.merge(self.render_record(&mut document, content));
                }
                document
            }
            RecordMode::PerRecord if contents.is_empty() => template.clone(),
            RecordMode::PerRecord => {
                let mut document = Document::new();
                for content in contents {
                    let mut copy = template.clone();
                    report.merge(self.render_record(&mut copy, content));
                    document.slides.append(&mut copy.slides);
                }
                document.renumber();
                document
            }
        };

        log::debug!(
            "Rendered {} record(s): {} paragraph(s) substituted, {} table(s) rebuilt, {} collapsed",
            report.records,
            report.paragraphs,
            report.tables_rebuilt,
            report.tables_collapsed
        );
        (document, report)
    }

    /// Apply one record's content to a document in place.
    ///
    /// Each slide gets text substitution on every text-bearing shape first,
    /// then table rebuilding on every table-bearing shape.
    pub fn render_record(&self, document: &mut Document, content: &Content) -> RenderReport {
        let mut report = RenderReport {
            records: 1,
            ..RenderReport::default()
        };

        for slide in &mut document.slides {
            for shape in &mut slide.shapes {
                if let Some(frame) = shape.text_frame.as_mut() {
                    report.paragraphs += substitute_frame(frame, content);
                }
            }

            for outcome in self.tables.rebuild_slide(slide, content) {
                match outcome {
                    TableOutcome::Rebuilt { .. } => report.tables_rebuilt += 1,
                    TableOutcome::Collapsed => report.tables_collapsed += 1,
                    TableOutcome::Skipped => {}
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Geometry, Paragraph, Shape, Slide, Table, TextFrame, TextRun};
    use serde_json::json;

    fn template() -> Document {
        let mut first = Slide::new(1, 0);
        let mut frame = TextFrame::new();
        frame.paragraphs.push(
            Paragraph::new()
                .with_run(TextRun::new("Report for {{client}}"))
                .with_run(TextRun::new(" ({{jobid}})")),
        );
        frame
            .paragraphs
            .push(Paragraph::new().with_run(TextRun::new("Generated {{jobdate}}")));
        first.add_shape(Shape::new(2, "Title 1").with_origin(0).with_text_frame(frame));

        let mut second = Slide::new(2, 1);
        let mut table = Table::new(1, 1, 5000, 500);
        table.cell_mut(0, 0).unwrap().set_text("{{table:orders}}");
        second.add_shape(
            Shape::new(4, "Table 3")
                .with_origin(0)
                .with_geometry(Geometry::new(10, 20, 5000, 500))
                .with_table(table),
        );
        second.add_shape(
            Shape::new(5, "Footer")
                .with_origin(1)
                .with_text_frame(TextFrame::with_text("{{unknown}}")),
        );

        let mut doc = Document::new();
        doc.add_slide(first);
        doc.add_slide(second);
        doc
    }

    fn content(client: &str, orders: serde_json::Value) -> Content {
        let mut content = Content::new();
        content.insert("client", client);
        content.insert("orders", orders);
        content.insert("jobid", "42");
        content.insert("jobdate", "2024-03-01 09:30:00");
        content
    }

    fn has_residual_tags(doc: &Document) -> bool {
        doc.all_lines()
            .iter()
            .any(|l| l.contains("{{") || l.contains("}}"))
    }

    #[test]
    fn test_single_record_fills_everything() {
        let rows = json!([{"item": "Bolt", "qty": 10}, {"item": "Nut", "qty": 25}]);
        let (doc, report) = Renderer::default().render(&template(), &[content("Acme", rows)]);

        assert_eq!(
            report,
            RenderReport {
                records: 1,
                paragraphs: 3,
                tables_rebuilt: 1,
                tables_collapsed: 0,
            }
        );
        assert_eq!(
            doc.all_lines(),
            vec![
                "Report for Acme (42)",
                "Generated 2024-03-01 09:30:00",
                "n/a",
                "item",
                "qty",
                "Bolt",
                "10",
                "Nut",
                "25",
            ]
        );
        assert!(!has_residual_tags(&doc));
    }

    #[test]
    fn test_cumulative_mode_keeps_first_record_values() {
        let first = content("Acme", json!([{"item": "Bolt"}]));
        let second = content("Globex", json!([{"item": "Gear"}]));
        let (doc, report) = Renderer::default().render(&template(), &[first, second]);

        assert_eq!(report.records, 2);
        assert_eq!(doc.slides.len(), 2);
        let lines = doc.all_lines();
        assert_eq!(lines[0], "Report for Acme (42)");
        assert!(lines.contains(&"Bolt".to_string()));
        assert!(!lines.contains(&"Gear".to_string()));
    }

    #[test]
    fn test_cumulative_second_record_collapses_rebuilt_table() {
        let rows = json!([{"item": "Bolt", "qty": 10}]);
        let first = content("Acme", rows.clone());
        let second = content("Globex", rows);
        let (doc, report) = Renderer::default().render(&template(), &[first, second]);

        assert_eq!(report.tables_rebuilt, 1);
        assert_eq!(report.tables_collapsed, 1);
        let table = doc.slides[1]
            .shapes
            .iter()
            .find_map(|s| s.table.as_ref())
            .unwrap();
        assert_eq!(table.cell(0, 0).unwrap().text(), "n/a");
        assert_eq!(table.cell(0, 1).unwrap().text(), "qty");
        assert_eq!(table.cell(1, 0).unwrap().text(), "Bolt");
    }

    #[test]
    fn test_delimited_leaves_rebuilt_table_for_later_records() {
        let renderer = Renderer::new(RenderOptions {
            marker_syntax: ListMarkerSyntax::Delimited,
            ..RenderOptions::default()
        });
        let rows = json!([{"item": "Bolt"}]);
        let (doc, report) = renderer.render(
            &template(),
            &[content("Acme", rows.clone()), content("Globex", rows)],
        );

        assert_eq!(report.tables_collapsed, 0);
        assert!(doc.all_lines().contains(&"item".to_string()));
    }

    #[test]
    fn test_per_record_mode_appends_copies() {
        let renderer = Renderer::new(RenderOptions {
            record_mode: RecordMode::PerRecord,
            ..RenderOptions::default()
        });
        let first = content("Acme", json!([{"item": "Bolt"}]));
        let second = content("Globex", json!([]));
        let (doc, report) = renderer.render(&template(), &[first, second]);

        assert_eq!(report.tables_rebuilt, 1);
        assert_eq!(report.tables_collapsed, 1);
        let numbers: Vec<_> = doc.slides.iter().map(|s| (s.number, s.origin)).collect();
        assert_eq!(numbers, vec![(1, 0), (2, 1), (3, 0), (4, 1)]);

        let lines = doc.all_lines();
        assert_eq!(lines[0], "Report for Acme (42)");
        assert!(lines.contains(&"Report for Globex (42)".to_string()));
        assert!(!has_residual_tags(&doc));
    }

    #[test]
    fn test_per_record_mode_without_records_returns_template() {
        let renderer = Renderer::new(RenderOptions {
            record_mode: RecordMode::PerRecord,
            ..RenderOptions::default()
        });
        let (doc, report) = renderer.render(&template(), &[]);
        assert_eq!(doc, template());
        assert_eq!(report, RenderReport::default());
    }

    #[test]
    fn test_only_job_keys_when_content_is_empty() {
        let mut content = Content::new();
        content.insert("jobid", "42");
        content.insert("jobdate", "2024-03-01 09:30:00");
        let (doc, report) = Renderer::default().render(&template(), &[content]);

        assert_eq!(report.tables_collapsed, 1);
        let lines = doc.all_lines();
        assert_eq!(lines[0], "Report for n/a (42)");
        assert!(lines.contains(&"n/a".to_string()));
    }

    #[test]
    fn test_record_mode_from_str() {
        assert_eq!("per-record".parse::<RecordMode>(), Ok(RecordMode::PerRecord));
        assert_eq!(" Cumulative ".parse::<RecordMode>(), Ok(RecordMode::Cumulative));
        assert!("batch".parse::<RecordMode>().is_err());
    }
}
