//! Events published by reload sessions.
//!
//! Per session: one `LoadingStarted`, progress and `SnapshotUpdated` events
//! as projects go through, then exactly one `Completed` unless the session
//! was cancelled. Failure notices arrive interleaved, subject to the error cap.

use std::path::PathBuf;
use std::sync::Arc;

use quay_types::{NonEmptyString, WorkspaceSnapshot};
use tokio::sync::mpsc;

/// A step of one project's pass through a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectPhase {
    RestoreStarted,
    RestoreCompleted,
    LoadStarted,
    LoadCompleted,
    CompileStarted,
    CompileCompleted,
}

#[derive(Debug, Clone)]
pub enum ReloadEvent {
    LoadingStarted {
        generation: u64,
    },
    Progress {
        generation: u64,
        project: PathBuf,
        phase: ProjectPhase,
    },
    SnapshotUpdated {
        generation: u64,
        snapshot: Arc<WorkspaceSnapshot>,
    },
    RestoreFailed {
        message: NonEmptyString,
    },
    LoadFailed {
        message: NonEmptyString,
    },
    Completed {
        generation: u64,
    },
}

/// Sending half of the event channel. Sends never block and are dropped
/// silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ReloadEvent>,
}

impl EventSink {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: ReloadEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Reload event dropped, no subscriber");
        }
    }
}
