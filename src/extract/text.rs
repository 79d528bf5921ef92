//! Text layer extraction.
//!
//! Spans are grouped into lines by baseline proximity, lines are ordered
//! top to bottom and joined with newlines. Nothing else is normalized.

use std::cmp::Ordering;

use super::content::{is_spaceless_script_char, TextSpan};

/// Spans whose baselines differ by less than this fraction of the font
/// size belong to the same line.
const LINE_TOLERANCE: f32 = 0.3;

/// A horizontal gap wider than this fraction of a character reads as a space.
const SPACE_GAP_RATIO: f32 = 0.2;

/// A text line composed of spans on the same baseline.
#[derive(Debug, Clone)]
pub(crate) struct TextLine {
    /// Spans sorted left to right
    pub(crate) spans: Vec<TextSpan>,
}

impl TextLine {
    /// Create a line, sorting its spans by X position.
    pub(crate) fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        Self { spans }
    }

    /// Combined text, inserting a space where the gap between spans
    /// is wide enough and the scripts on both sides use spaces.
    pub(crate) fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                if needs_separator(prev, span) {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }

        result
    }
}

fn needs_separator(prev: &TextSpan, span: &TextSpan) -> bool {
    let gap = span.x - prev.right();

    let char_count = span.text.chars().count();
    let avg_char_width = if char_count > 0 && span.width > 0.0 {
        span.width / char_count as f32
    } else {
        span.font_size * 0.5
    };

    if gap <= avg_char_width * SPACE_GAP_RATIO {
        return false;
    }

    let prev_last = prev.text.chars().last();
    let curr_first = span.text.chars().next();

    let both_spaceless = prev_last.map(is_spaceless_script_char).unwrap_or(false)
        && curr_first.map(is_spaceless_script_char).unwrap_or(false);
    let already_spaced = prev_last.map(|c| c.is_whitespace()).unwrap_or(false)
        || curr_first.map(|c| c.is_whitespace()).unwrap_or(false);

    !both_spaceless && !already_spaced
}

/// Group spans into lines, top of the page first.
pub(crate) fn group_into_lines(spans: &[TextSpan]) -> Vec<TextLine> {
    let mut sorted = spans.to_vec();
    sorted.sort_by(|a, b| match b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal),
        other => other,
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in sorted {
        let tolerance = span.font_size * LINE_TOLERANCE;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }

    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

/// Render spans as page text. `None` when there is no text at all.
pub fn spans_to_text(spans: &[TextSpan]) -> Option<String> {
    if spans.is_empty() {
        return None;
    }

    let text = group_into_lines(spans)
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n");

    Some(text)
}
