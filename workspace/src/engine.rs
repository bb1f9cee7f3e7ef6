//! The compilation engine seam.
//!
//! The engine owns semantic analysis. This crate only asks it to load and
//! compile projects, hand out snapshots, and compute or apply fixes.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use quay_types::{DiagnosticRef, DocumentId, FixSuggestion, WorkspaceSnapshot};
use thiserror::Error;

/// Engine call future type alias.
pub type EngineFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, EngineError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to load project {}: {message}", path.display())]
    Load { path: PathBuf, message: String },
    #[error("Failed to compile project {name}: {message}")]
    Compile { name: String, message: String },
    #[error("Fix computation failed: {0}")]
    Fix(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A project the engine has loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectHandle {
    path: PathBuf,
    name: String,
}

impl ProjectHandle {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Proof that an engine is safe to share across reload sessions and fix
/// requests.
///
/// Implementations are not assumed to be reentrant per workspace: the reload
/// coordinator never issues two `load_project`/`compile_project` calls at
/// once. Fix requests may run concurrently with a reload.
pub trait CompilationEngine: Send + Sync {
    fn load_project<'a>(&'a self, path: &'a Path) -> EngineFut<'a, ProjectHandle>;

    fn compile_project<'a>(&'a self, project: &'a ProjectHandle) -> EngineFut<'a, ()>;

    /// The engine's current view of the workspace.
    fn current_snapshot(&self) -> Arc<WorkspaceSnapshot>;

    /// Drop every loaded project. Called at the start of a full reload.
    fn close_workspace(&self);

    /// Root suggestions for one diagnostic, in the engine's order. Each root
    /// may be a group of nested suggestions.
    fn fix_suggestions<'a>(
        &'a self,
        snapshot: &'a WorkspaceSnapshot,
        document: &'a DocumentId,
        diagnostic: &'a DiagnosticRef,
    ) -> EngineFut<'a, Vec<FixSuggestion>>;

    /// Apply one leaf suggestion to `snapshot`, returning the changed
    /// snapshot. The engine's own state is not modified.
    fn apply_fix<'a>(
        &'a self,
        snapshot: &'a WorkspaceSnapshot,
        document: &'a DocumentId,
        suggestion: &'a FixSuggestion,
    ) -> EngineFut<'a, Arc<WorkspaceSnapshot>>;
}
