//! Filesystem-backed engine.
//!
//! Loads every source file under a project's directory as a document. It has
//! no semantic model, so it never produces fixes. Used by the CLI and as a
//! realistic engine in integration tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use ignore::WalkBuilder;
use quay_types::{
    DiagnosticRef, Document, DocumentId, FixSuggestion, ProjectSnapshot, WorkspaceSnapshot,
};

use crate::engine::{CompilationEngine, EngineError, EngineFut, ProjectHandle};

pub struct DirectoryEngine {
    source_extensions: Vec<String>,
    snapshot: RwLock<Arc<WorkspaceSnapshot>>,
}

impl DirectoryEngine {
    #[must_use]
    pub fn new(source_extensions: Vec<String>) -> Self {
        Self {
            source_extensions,
            snapshot: RwLock::new(Arc::new(WorkspaceSnapshot::empty())),
        }
    }

    fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.source_extensions.iter().any(|s| s == ext))
    }

    fn read_project(&self, path: &Path) -> Result<ProjectSnapshot, EngineError> {
        if !path.is_file() {
            return Err(EngineError::Load {
                path: path.to_path_buf(),
                message: "project file does not exist".to_string(),
            });
        }
        let Some(root) = path.parent() else {
            return Err(EngineError::Load {
                path: path.to_path_buf(),
                message: "project file has no directory".to_string(),
            });
        };

        let mut documents = Vec::new();
        for entry in WalkBuilder::new(root)
            .sort_by_file_name(Ord::cmp)
            .build()
            .filter_map(Result::ok)
        {
            let file = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) || !self.is_source(file) {
                continue;
            }
            match std::fs::read_to_string(file) {
                Ok(text) => documents.push(Document::new(DocumentId::new(file), text)),
                Err(e) => {
                    tracing::debug!(
                        path = %file.display(),
                        error = %e,
                        "Skipping unreadable document"
                    );
                }
            }
        }
        Ok(ProjectSnapshot::new(path, documents))
    }
}

impl CompilationEngine for DirectoryEngine {
    fn load_project<'a>(&'a self, path: &'a Path) -> EngineFut<'a, ProjectHandle> {
        Box::pin(async move {
            let project = self.read_project(path)?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::debug!(
                project = %name,
                documents = project.documents().count(),
                "Directory engine loaded project"
            );
            let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::new(guard.with_project(project));
            Ok(ProjectHandle::new(PathBuf::from(path), name))
        })
    }

    fn compile_project<'a>(&'a self, _project: &'a ProjectHandle) -> EngineFut<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn current_snapshot(&self) -> Arc<WorkspaceSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn close_workspace(&self) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(WorkspaceSnapshot::empty());
    }

    fn fix_suggestions<'a>(
        &'a self,
        _snapshot: &'a WorkspaceSnapshot,
        _document: &'a DocumentId,
        _diagnostic: &'a DiagnosticRef,
    ) -> EngineFut<'a, Vec<FixSuggestion>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn apply_fix<'a>(
        &'a self,
        _snapshot: &'a WorkspaceSnapshot,
        _document: &'a DocumentId,
        suggestion: &'a FixSuggestion,
    ) -> EngineFut<'a, Arc<WorkspaceSnapshot>> {
        Box::pin(async move {
            Err(EngineError::Fix(format!(
                "directory engine cannot apply '{}'",
                suggestion.title()
            )))
        })
    }
}
