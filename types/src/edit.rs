//! Text edits produced by resolving a fix.

use serde::{Deserialize, Serialize};

use crate::snapshot::DocumentId;

/// Zero-based line and UTF-16 character offset, as protocol clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Position of a byte offset in `text`.
    ///
    /// `offset` must lie on a char boundary; offsets past the end clamp to
    /// the end of the text.
    #[must_use]
    pub fn of_offset(text: &str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let prefix = &text[..offset];
        let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
        let line = prefix.bytes().filter(|b| *b == b'\n').count();
        let character: usize = prefix[line_start..].chars().map(char::len_utf16).sum();
        Self {
            line: line as u32,
            character: character as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Half-open byte range `[start, end)` in a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Replace `span` of the old text with `new_text`.
///
/// `range` carries the same span as line/character positions of the old
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub span: TextSpan,
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    #[must_use]
    pub fn new(old_text: &str, span: TextSpan, new_text: impl Into<String>) -> Self {
        Self {
            span,
            range: Range::new(
                Position::of_offset(old_text, span.start),
                Position::of_offset(old_text, span.end),
            ),
            new_text: new_text.into(),
        }
    }
}

/// Ordered edits for one changed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEdit {
    pub document: DocumentId,
    pub edits: Vec<TextEdit>,
}

/// Apply non-overlapping edits expressed in `text`'s coordinates.
///
/// Edits are applied from the back so earlier spans stay valid.
#[must_use]
pub fn apply_text_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|e| e.span.start);
    let mut out = text.to_string();
    for edit in ordered.into_iter().rev() {
        out.replace_range(edit.span.start..edit.span.end, &edit.new_text);
    }
    out
}
