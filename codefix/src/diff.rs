//! Translate a post-fix snapshot into per-document text edits.
//!
//! Only documents present in both snapshots are considered. Documents a fix
//! creates or deletes have no representation as text edits and are skipped.
//! A document linked into several projects yields one group of edits.

use std::collections::HashSet;
use std::time::Duration;

use quay_types::{DocumentEdit, TextEdit, TextSpan, WorkspaceSnapshot};
use similar::{Algorithm, DiffTag, TextDiff};

/// Upper bound on time spent computing one document's diff. Past it the
/// diff is still correct, just not minimal.
const DIFF_TIMEOUT: Duration = Duration::from_millis(500);

/// Edits turning each changed document of `before` into its `after` text.
///
/// One [`DocumentEdit`] per changed document, in `after`'s document order.
#[must_use]
pub fn translate(before: &WorkspaceSnapshot, after: &WorkspaceSnapshot) -> Vec<DocumentEdit> {
    let mut changes = Vec::new();
    let mut seen = HashSet::new();
    for document in after.documents() {
        if !seen.insert(document.id()) {
            continue;
        }
        let Some(old) = before.document(document.id()) else {
            tracing::debug!(document = %document.id(), "Skipping document created by fix");
            continue;
        };
        if old.text() == document.text() {
            continue;
        }
        let edits = text_edits(old.text(), document.text());
        if edits.is_empty() {
            continue;
        }
        changes.push(DocumentEdit {
            document: document.id().clone(),
            edits,
        });
    }

    for document in before.documents() {
        if after.document(document.id()).is_none() {
            tracing::debug!(document = %document.id(), "Skipping document removed by fix");
        }
    }
    changes
}

/// Ordered, non-overlapping edits in `old`'s coordinates turning `old` into
/// `new`. Adjacent deletions and insertions merge into one replacement.
#[must_use]
pub fn text_edits(old: &str, new: &str) -> Vec<TextEdit> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(DIFF_TIMEOUT)
        .diff_chars(old, new);

    let old_offsets = char_offsets(old);
    let new_offsets = char_offsets(new);

    let mut edits = Vec::new();
    // (old char range, new char range) of the replacement being built.
    let mut pending: Option<(usize, usize, usize, usize)> = None;

    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            if let Some(run) = pending.take() {
                edits.push(make_edit(old, new, &old_offsets, &new_offsets, run));
            }
            continue;
        }
        pending = Some(match pending {
            Some((old_start, _, new_start, _)) => {
                (old_start, old_range.end, new_start, new_range.end)
            }
            None => (old_range.start, old_range.end, new_range.start, new_range.end),
        });
    }
    if let Some(run) = pending {
        edits.push(make_edit(old, new, &old_offsets, &new_offsets, run));
    }
    edits
}

/// Byte offset of every char index, plus the total length at the end.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

fn make_edit(
    old: &str,
    new: &str,
    old_offsets: &[usize],
    new_offsets: &[usize],
    (old_start, old_end, new_start, new_end): (usize, usize, usize, usize),
) -> TextEdit {
    let span = TextSpan::new(old_offsets[old_start], old_offsets[old_end]);
    let replacement = &new[new_offsets[new_start]..new_offsets[new_end]];
    TextEdit::new(old, span, replacement)
}
