//! Workspace synchronization for Quay.
//!
//! Tracks project files, restores and loads them into a compilation engine,
//! and publishes workspace snapshots as projects come in.

pub mod directory;
pub mod engine;
pub mod events;
pub mod restore;

mod context;
mod coordinator;
mod projects;
mod reporter;

pub use context::WorkspaceContext;
pub use coordinator::{
    ReloadCoordinator, ReloadMode, ReloadSession, SessionHandle, SessionOptions, SessionOutcome,
};
pub use directory::DirectoryEngine;
pub use engine::{CompilationEngine, EngineError, EngineFut, ProjectHandle};
pub use events::{EventSink, ProjectPhase, ReloadEvent};
pub use projects::{ProjectSet, ProjectSetError};
pub use reporter::ErrorReporter;
pub use restore::{CommandRestoreRunner, RestoreError, RestoreFut, RestoreOutcome, RestoreTool};
