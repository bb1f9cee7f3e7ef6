//! Fix request API.
//!
//! Requests read whatever snapshot is current when they start and never wait
//! on a running reload.

use std::sync::Arc;

use quay_types::{
    DiagnosticRef, DocumentEdit, DocumentId, FixDescriptor, SuggestionRef, WorkspaceSnapshot,
};
use quay_workspace::CompilationEngine;
use tokio::sync::watch;

use crate::diff;
use crate::flatten::flatten_all;

#[derive(Clone)]
pub struct FixService {
    engine: Arc<dyn CompilationEngine>,
    snapshots: watch::Receiver<Arc<WorkspaceSnapshot>>,
}

impl FixService {
    #[must_use]
    pub fn new(
        engine: Arc<dyn CompilationEngine>,
        snapshots: watch::Receiver<Arc<WorkspaceSnapshot>>,
    ) -> Self {
        Self { engine, snapshots }
    }

    fn snapshot(&self) -> Arc<WorkspaceSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Flattened fixes for each diagnostic, in diagnostic order then leaf
    /// order. Empty when the document is not in the current snapshot.
    pub async fn list_fixes(
        &self,
        document: &DocumentId,
        diagnostics: &[DiagnosticRef],
    ) -> Vec<FixDescriptor> {
        let snapshot = self.snapshot();
        if snapshot.document(document).is_none() {
            tracing::debug!(%document, "Fix listing for unknown document");
            return Vec::new();
        }

        let mut fixes = Vec::new();
        for diagnostic in diagnostics {
            let roots = match self
                .engine
                .fix_suggestions(&snapshot, document, diagnostic)
                .await
            {
                Ok(roots) => roots,
                Err(e) => {
                    tracing::warn!(%document, code = %diagnostic.code, "Fix listing failed: {e}");
                    continue;
                }
            };
            fixes.extend(
                flatten_all(&roots)
                    .into_iter()
                    .map(|leaf| FixDescriptor::from_suggestion(leaf, document, diagnostic)),
            );
        }
        fixes
    }

    /// Apply one listed fix and return its edits against the snapshot read
    /// when the request started. Empty when anything along the way is
    /// missing or fails.
    pub async fn resolve_fix(&self, suggestion: &SuggestionRef) -> Vec<DocumentEdit> {
        let snapshot = self.snapshot();
        let document = &suggestion.document;
        if snapshot.document(document).is_none() {
            tracing::debug!(%document, "Fix resolution for unknown document");
            return Vec::new();
        }

        let roots = match self
            .engine
            .fix_suggestions(&snapshot, document, &suggestion.diagnostic)
            .await
        {
            Ok(roots) => roots,
            Err(e) => {
                tracing::warn!(%document, "Fix resolution failed: {e}");
                return Vec::new();
            }
        };
        let Some(leaf) = flatten_all(&roots)
            .into_iter()
            .find(|leaf| suggestion.matches(leaf))
        else {
            tracing::debug!(
                %document,
                key = %suggestion.key,
                title = %suggestion.title,
                "Fix no longer offered"
            );
            return Vec::new();
        };

        match self.engine.apply_fix(&snapshot, document, leaf).await {
            Ok(changed) => diff::translate(&snapshot, &changed),
            Err(e) => {
                tracing::warn!(%document, key = %suggestion.key, "Applying fix failed: {e}");
                Vec::new()
            }
        }
    }
}
