//! Scalar placeholder substitution in paragraphs.

use crate::content::{stringify, Content};
use crate::placeholder::{scan, tag_for};
use crate::types::{Paragraph, TextFrame};

/// Text written where a placeholder has no value.
pub const NOT_AVAILABLE: &str = "n/a";

/// Substitute every placeholder in `text`.
///
/// Keys are applied in content order, each replacing every exact `{{key}}`.
/// Then the leftmost remaining tag, and every other copy of it, becomes
/// `n/a`, until no complete tag is left. `n/a` holds no brace, so each pass
/// removes at least one `{{` and the sweep ends.
pub fn substitute(text: &str, content: &Content) -> String {
    let mut result = text.to_string();

    for (key, value) in content.iter() {
        let tag = tag_for(key);
        if result.contains(&tag) {
            result = result.replace(&tag, &stringify(value));
        }
    }

    loop {
        let next = scan(&result).next().map(|p| p.tag.to_string());
        let Some(tag) = next else {
            break;
        };
        result = result.replace(&tag, NOT_AVAILABLE);
    }

    result
}

/// Substitute placeholders across the runs of a paragraph.
///
/// Matching runs on the concatenated text, so a tag may span runs. The result
/// goes into the first run and every other run is emptied, so only the first
/// run's formatting survives. Returns whether the paragraph text changed.
pub fn substitute_paragraph(paragraph: &mut Paragraph, content: &Content) -> bool {
    let Some((first, rest)) = paragraph.runs.split_first_mut() else {
        return false;
    };

    let original: String = std::iter::once(&*first)
        .chain(rest.iter())
        .map(|r| r.text.as_str())
        .collect();
    let substituted = substitute(&original, content);

    for run in rest.iter_mut() {
        run.text.clear();
    }
    let changed = substituted != original;
    first.text = substituted;
    changed
}

/// Substitute placeholders in every paragraph of a text body. Returns the
/// number of paragraphs whose text changed.
pub fn substitute_frame(frame: &mut TextFrame, content: &Content) -> usize {
    frame
        .paragraphs
        .iter_mut()
        .map(|p| substitute_paragraph(p, content))
        .filter(|changed| *changed)
        .count()
}
