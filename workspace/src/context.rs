//! Workspace context: the single owner of workspace state.
//!
//! `new()` wires the project set, the error reporter, the reload coordinator
//! and the snapshot channel. There is no global instance; independent
//! contexts can coexist.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quay_config::WorkspaceConfig;
use quay_types::{ProjectRecord, WorkspaceSnapshot};
use tokio::sync::{mpsc, watch};

use crate::coordinator::{ReloadCoordinator, ReloadMode, SessionHandle, SessionOptions};
use crate::engine::CompilationEngine;
use crate::events::{EventSink, ReloadEvent};
use crate::projects::{ProjectSet, ProjectSetError};
use crate::reporter::ErrorReporter;
use crate::restore::RestoreTool;

pub struct WorkspaceContext {
    projects: Mutex<ProjectSet>,
    coordinator: ReloadCoordinator,
    reporter: Arc<ErrorReporter>,
    engine: Arc<dyn CompilationEngine>,
    snapshot_rx: watch::Receiver<Arc<WorkspaceSnapshot>>,
}

impl WorkspaceContext {
    /// Build a context and the receiving end of its event channel.
    pub fn new(
        config: &WorkspaceConfig,
        engine: Arc<dyn CompilationEngine>,
        restore: Arc<dyn RestoreTool>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ReloadEvent>), ProjectSetError> {
        let projects =
            ProjectSet::new(&config.exclude_patterns, config.project_extensions.clone())?;
        let (events, events_rx) = EventSink::channel();
        let reporter = Arc::new(ErrorReporter::new(config.max_reported_errors, events.clone()));
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.current_snapshot());
        let coordinator = ReloadCoordinator::new(
            engine.clone(),
            restore,
            reporter.clone(),
            events,
            snapshot_tx,
            SessionOptions {
                restore_before_load: config.restore_before_load,
                compile_after_load: config.compile_after_load,
            },
        );

        Ok((
            Self {
                projects: Mutex::new(projects),
                coordinator,
                reporter,
                engine,
                snapshot_rx,
            },
            events_rx,
        ))
    }

    fn projects(&self) -> MutexGuard<'_, ProjectSet> {
        self.projects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track project files. Does not reload.
    pub fn add_projects<I, P>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.projects().add_projects(paths)
    }

    /// Stop tracking project files. Does not reload.
    pub fn remove_projects<I, P>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.projects().remove_projects(paths)
    }

    /// Discover and track the project files under each folder.
    pub fn add_workspace_folders<I, P>(&self, folders: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut projects = self.projects();
        let found: Vec<PathBuf> = folders
            .into_iter()
            .flat_map(|folder| projects.discover(folder.as_ref()))
            .collect();
        tracing::debug!(count = found.len(), "Discovered project files");
        projects.add_projects(found)
    }

    #[must_use]
    pub fn tracked_projects(&self) -> Vec<ProjectRecord> {
        self.projects().tracked()
    }

    /// Close the engine workspace and load every tracked project again.
    pub fn reload(&self) -> SessionHandle {
        let projects = self.tracked_projects();
        self.coordinator.start(ReloadMode::Reload, projects)
    }

    /// Load tracked projects that are not in the current snapshot.
    pub fn load(&self) -> SessionHandle {
        let projects = self.tracked_projects();
        self.coordinator.start(ReloadMode::LoadNew, projects)
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<WorkspaceSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    #[must_use]
    pub fn snapshot_watch(&self) -> watch::Receiver<Arc<WorkspaceSnapshot>> {
        self.snapshot_rx.clone()
    }

    #[must_use]
    pub fn engine(&self) -> Arc<dyn CompilationEngine> {
        self.engine.clone()
    }

    #[must_use]
    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    #[must_use]
    pub fn coordinator(&self) -> &ReloadCoordinator {
        &self.coordinator
    }

    /// Cancel any running session and wait for it to exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down workspace");
        self.coordinator.shutdown().await;
    }
}
