//! Flatten fix-suggestion trees to their leaves.

use quay_types::FixSuggestion;

/// Leaves of `suggestion`, depth-first, left to right.
///
/// A node without children (including one with an empty child list) is its
/// own single leaf.
#[must_use]
pub fn flatten(suggestion: &FixSuggestion) -> Vec<&FixSuggestion> {
    let mut leaves = Vec::new();
    collect_leaves(suggestion, &mut leaves);
    leaves
}

/// Flatten every root in order and concatenate the results.
#[must_use]
pub fn flatten_all(suggestions: &[FixSuggestion]) -> Vec<&FixSuggestion> {
    let mut leaves = Vec::new();
    for suggestion in suggestions {
        collect_leaves(suggestion, &mut leaves);
    }
    leaves
}

fn collect_leaves<'a>(node: &'a FixSuggestion, out: &mut Vec<&'a FixSuggestion>) {
    if !node.has_children() {
        out.push(node);
        return;
    }
    for child in node.children() {
        collect_leaves(child, out);
    }
}
