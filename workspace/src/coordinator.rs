//! Reload coordination.
//!
//! One reload session runs at a time. Starting a session cancels the current
//! one before the new session is spawned, and the new session waits for the
//! old one to exit before its first step. Within a session projects are
//! restored, loaded and (optionally) compiled strictly one after another,
//! and the engine's snapshot is published after every successful load.
//!
//! Cancellation is silent: a cancelled session emits no `Completed` event
//! and reports nothing. An engine panic while processing a project is
//! reported as a load failure for that project and the session moves on.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use quay_types::{ProjectRecord, WorkspaceSnapshot};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::CompilationEngine;
use crate::events::{EventSink, ProjectPhase, ReloadEvent};
use crate::reporter::ErrorReporter;
use crate::restore::{RestoreError, RestoreOutcome, RestoreTool, restore_failure_message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMode {
    /// Close the engine workspace and load every tracked project.
    Reload,
    /// Load only tracked projects missing from the current snapshot.
    LoadNew,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub restore_before_load: bool,
    pub compile_after_load: bool,
}

/// The current reload session: a generation and its cancellation handle.
#[derive(Debug, Clone)]
pub struct ReloadSession {
    generation: u64,
    token: CancellationToken,
}

impl ReloadSession {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed { loaded: usize, failed: usize },
    Cancelled,
    /// The session task itself panicked outside any project step.
    Aborted,
}

/// Handle to a spawned session.
#[derive(Debug)]
pub struct SessionHandle {
    session: ReloadSession,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.session.generation
    }

    pub fn cancel(&self) {
        self.session.token.cancel();
    }

    /// Wait for the session to finish.
    pub async fn wait(self) -> SessionOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                tracing::error!(generation = self.session.generation, "Reload task panicked: {e}");
                SessionOutcome::Aborted
            }
            Err(e) => {
                tracing::warn!(generation = self.session.generation, "Reload task failed: {e}");
                SessionOutcome::Cancelled
            }
        }
    }
}

struct Shared {
    engine: Arc<dyn CompilationEngine>,
    restore: Arc<dyn RestoreTool>,
    reporter: Arc<ErrorReporter>,
    events: EventSink,
    snapshot_tx: watch::Sender<Arc<WorkspaceSnapshot>>,
    options: SessionOptions,
    /// Held for the whole life of a running session.
    run_lock: AsyncMutex<()>,
}

pub struct ReloadCoordinator {
    shared: Arc<Shared>,
    current: Mutex<Option<ReloadSession>>,
    last_generation: AtomicU64,
}

impl ReloadCoordinator {
    #[must_use]
    pub fn new(
        engine: Arc<dyn CompilationEngine>,
        restore: Arc<dyn RestoreTool>,
        reporter: Arc<ErrorReporter>,
        events: EventSink,
        snapshot_tx: watch::Sender<Arc<WorkspaceSnapshot>>,
        options: SessionOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine,
                restore,
                reporter,
                events,
                snapshot_tx,
                options,
                run_lock: AsyncMutex::new(()),
            }),
            current: Mutex::new(None),
            last_generation: AtomicU64::new(0),
        }
    }

    /// Cancel the current session and spawn a new one over `projects`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, mode: ReloadMode, projects: Vec<ProjectRecord>) -> SessionHandle {
        let session = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = current.take() {
                tracing::debug!(generation = previous.generation, "Cancelling reload session");
                previous.token.cancel();
            }
            let session = ReloadSession {
                generation: self.last_generation.fetch_add(1, Ordering::AcqRel) + 1,
                token: CancellationToken::new(),
            };
            *current = Some(session.clone());
            session
        };

        let task = tokio::spawn(run_session(
            self.shared.clone(),
            session.clone(),
            mode,
            projects,
        ));
        SessionHandle { session, task }
    }

    /// Cancel the current session, if any, without starting another.
    pub fn cancel(&self) {
        if let Some(session) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            tracing::debug!(generation = session.generation, "Cancelling reload session");
            session.token.cancel();
        }
    }

    /// Cancel and wait until no session is running.
    pub async fn shutdown(&self) {
        self.cancel();
        let _guard = self.shared.run_lock.lock().await;
    }

    /// The session started most recently, unless it was cancelled through
    /// [`cancel`](Self::cancel).
    #[must_use]
    pub fn current_session(&self) -> Option<ReloadSession> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Run `fut` unless `token` fires first.
async fn unless_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = token.cancelled() => None,
        output = fut => Some(output),
    }
}

enum ProjectResult {
    Loaded,
    Failed,
}

async fn run_session(
    shared: Arc<Shared>,
    session: ReloadSession,
    mode: ReloadMode,
    projects: Vec<ProjectRecord>,
) -> SessionOutcome {
    let generation = session.generation;
    let token = &session.token;

    let Some(_running) = unless_cancelled(token, shared.run_lock.lock()).await else {
        tracing::debug!(generation, "Reload session cancelled before start");
        return SessionOutcome::Cancelled;
    };

    tracing::info!(generation, projects = projects.len(), ?mode, "Reload session started");
    shared.events.send(ReloadEvent::LoadingStarted { generation });

    if mode == ReloadMode::Reload {
        shared.engine.close_workspace();
        publish(&shared, generation, shared.engine.current_snapshot());
    }

    let mut loaded = 0;
    let mut failed = 0;
    for project in &projects {
        if token.is_cancelled() {
            tracing::debug!(generation, "Reload session cancelled");
            return SessionOutcome::Cancelled;
        }
        if mode == ReloadMode::LoadNew {
            let already_loaded = shared.snapshot_tx.borrow().contains_project(project.path());
            if already_loaded {
                tracing::debug!(project = %project.name(), "Project already loaded, skipping");
                continue;
            }
        }
        let step = AssertUnwindSafe(process_project(&shared, &session, project));
        match step.catch_unwind().await {
            Ok(Some(ProjectResult::Loaded)) => loaded += 1,
            Ok(Some(ProjectResult::Failed)) => failed += 1,
            Ok(None) => {
                tracing::debug!(generation, project = %project.name(), "Reload session cancelled");
                return SessionOutcome::Cancelled;
            }
            Err(_) if token.is_cancelled() => return SessionOutcome::Cancelled,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(generation, project = %project.name(), %message, "Engine panicked");
                shared.reporter.report_load_error(&format!(
                    "Failed to load project {}: engine panicked: {message}",
                    project.path().display()
                ));
                failed += 1;
            }
        }
    }

    if token.is_cancelled() {
        return SessionOutcome::Cancelled;
    }
    shared.events.send(ReloadEvent::Completed { generation });
    tracing::info!(generation, loaded, failed, "Reload session completed");
    SessionOutcome::Completed { loaded, failed }
}

/// Restore, load and optionally compile one project. `None` means the
/// session was cancelled.
async fn process_project(
    shared: &Shared,
    session: &ReloadSession,
    project: &ProjectRecord,
) -> Option<ProjectResult> {
    let generation = session.generation;
    let token = &session.token;
    let progress = |phase| {
        shared.events.send(ReloadEvent::Progress {
            generation,
            project: project.path().to_path_buf(),
            phase,
        });
    };

    if shared.options.restore_before_load {
        progress(ProjectPhase::RestoreStarted);
        tracing::debug!(project = %project.name(), "Restoring project");
        match shared.restore.restore(project.path(), token).await {
            Ok(RestoreOutcome::Succeeded) => {}
            Ok(RestoreOutcome::Failed { exit_code, output }) => {
                tracing::debug!(project = %project.name(), ?exit_code, %output, "Restore failed");
                shared
                    .reporter
                    .report_restore_error(&restore_failure_message(project.name(), exit_code));
            }
            Err(RestoreError::Cancelled) => return None,
            Err(e) => {
                shared
                    .reporter
                    .report_restore_error(&format!("Failed to restore {}. {e}", project.name()));
            }
        }
        progress(ProjectPhase::RestoreCompleted);
        if token.is_cancelled() {
            return None;
        }
    }

    progress(ProjectPhase::LoadStarted);
    tracing::debug!(project = %project.name(), "Loading project");
    let handle = match unless_cancelled(token, shared.engine.load_project(project.path())).await? {
        Ok(handle) => handle,
        Err(e) => {
            shared.reporter.report_load_error(&e.to_string());
            return Some(ProjectResult::Failed);
        }
    };
    progress(ProjectPhase::LoadCompleted);
    publish(shared, generation, shared.engine.current_snapshot());

    if shared.options.compile_after_load {
        progress(ProjectPhase::CompileStarted);
        if let Err(e) = unless_cancelled(token, shared.engine.compile_project(&handle)).await? {
            shared.reporter.report_load_error(&e.to_string());
        }
        progress(ProjectPhase::CompileCompleted);
    }

    Some(ProjectResult::Loaded)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

fn publish(shared: &Shared, generation: u64, snapshot: Arc<WorkspaceSnapshot>) {
    shared.snapshot_tx.send_replace(snapshot.clone());
    shared
        .events
        .send(ReloadEvent::SnapshotUpdated { generation, snapshot });
}
