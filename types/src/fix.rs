//! Fix suggestions as produced by the compilation engine, and the flat
//! descriptors handed to clients.

use serde::{Deserialize, Serialize};

use crate::edit::Range;
use crate::snapshot::DocumentId;

/// A diagnostic the client wants fixes for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiagnosticRef {
    /// Diagnostic code (e.g. `CS0103`).
    pub code: String,
    pub range: Range,
}

impl DiagnosticRef {
    #[must_use]
    pub fn new(code: impl Into<String>, range: Range) -> Self {
        Self {
            code: code.into(),
            range,
        }
    }
}

/// A node of the engine's fix tree.
///
/// Containers group related fixes (e.g. "Add using" with one child per
/// namespace). Only leaves are ever shown to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixSuggestion {
    title: String,
    equivalence_key: Option<String>,
    is_preferred: bool,
    children: Vec<FixSuggestion>,
}

impl FixSuggestion {
    #[must_use]
    pub fn leaf(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            equivalence_key: None,
            is_preferred: false,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn group(title: impl Into<String>, children: Vec<FixSuggestion>) -> Self {
        Self {
            children,
            ..Self::leaf(title)
        }
    }

    #[must_use]
    pub fn with_equivalence_key(mut self, key: impl Into<String>) -> Self {
        self.equivalence_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn preferred(mut self) -> Self {
        self.is_preferred = true;
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn equivalence_key(&self) -> Option<&str> {
        self.equivalence_key.as_deref()
    }

    #[must_use]
    pub fn is_preferred(&self) -> bool {
        self.is_preferred
    }

    #[must_use]
    pub fn children(&self) -> &[FixSuggestion] {
        &self.children
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Key used to find this suggestion again on resolution: the
    /// equivalence key when present, the title otherwise.
    #[must_use]
    pub fn lookup_key(&self) -> &str {
        self.equivalence_key.as_deref().unwrap_or(&self.title)
    }
}

/// Enough context to re-request and re-apply one flattened suggestion.
///
/// Engines may give several leaves the same equivalence key, so a leaf is
/// identified by its lookup key and its title together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestionRef {
    pub document: DocumentId,
    pub diagnostic: DiagnosticRef,
    pub key: String,
    pub title: String,
}

impl SuggestionRef {
    #[must_use]
    pub fn matches(&self, leaf: &FixSuggestion) -> bool {
        leaf.lookup_key() == self.key && leaf.title() == self.title
    }
}

/// A fix as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixDescriptor {
    pub title: String,
    pub equivalence_key: Option<String>,
    pub is_preferred: bool,
    pub suggestion: SuggestionRef,
}

impl FixDescriptor {
    #[must_use]
    pub fn from_suggestion(
        suggestion: &FixSuggestion,
        document: &DocumentId,
        diagnostic: &DiagnosticRef,
    ) -> Self {
        Self {
            title: suggestion.title().to_string(),
            equivalence_key: suggestion.equivalence_key().map(str::to_string),
            is_preferred: suggestion.is_preferred(),
            suggestion: SuggestionRef {
                document: document.clone(),
                diagnostic: diagnostic.clone(),
                key: suggestion.lookup_key().to_string(),
                title: suggestion.title().to_string(),
            },
        }
    }
}
