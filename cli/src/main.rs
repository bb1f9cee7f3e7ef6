//! Quay CLI - discover projects under the given folders and load them.
//!
//! ```text
//! main() -> QuayConfig::load() -> WorkspaceContext::new(DirectoryEngine, CommandRestoreRunner)
//!        -> add_workspace_folders(args) -> reload() -> log events until the session ends
//! ```
//!
//! Ctrl-C cancels the running session. Logs go to stderr, filtered by
//! `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quay_config::QuayConfig;
use quay_workspace::{
    CommandRestoreRunner, DirectoryEngine, ReloadEvent, SessionOutcome, WorkspaceContext,
};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// Folder arguments, canonicalized. Defaults to the current directory.
fn workspace_folders() -> Result<Vec<PathBuf>> {
    let mut args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if args.is_empty() {
        args.push(PathBuf::from("."));
    }
    args.into_iter()
        .map(|folder| {
            folder
                .canonicalize()
                .with_context(|| format!("Workspace folder {} not found", folder.display()))
        })
        .collect()
}

fn log_event(event: &ReloadEvent) {
    match event {
        ReloadEvent::LoadingStarted { generation } => {
            tracing::info!(generation, "Loading projects");
        }
        ReloadEvent::Progress {
            project, phase, ..
        } => {
            tracing::debug!(project = %project.display(), ?phase, "Project progress");
        }
        ReloadEvent::SnapshotUpdated { snapshot, .. } => {
            tracing::info!(
                projects = snapshot.project_count(),
                documents = snapshot.document_count(),
                "Workspace updated"
            );
        }
        ReloadEvent::RestoreFailed { message } | ReloadEvent::LoadFailed { message } => {
            tracing::error!("{message}");
        }
        ReloadEvent::Completed { generation } => {
            tracing::info!(generation, "Loading complete");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = QuayConfig::load()
        .context("Failed to load configuration")?
        .unwrap_or_default();
    let folders = workspace_folders()?;

    let engine = Arc::new(DirectoryEngine::new(
        config.workspace.source_extensions.clone(),
    ));
    let restore = Arc::new(CommandRestoreRunner::from_config(&config.restore));
    let (workspace, mut events) = WorkspaceContext::new(&config.workspace, engine, restore)
        .context("Invalid workspace configuration")?;

    let tracked = workspace.add_workspace_folders(&folders);
    tracing::info!(projects = tracked, "Tracking projects");

    let session = workspace.reload();
    let mut finished = pin!(session.wait());
    let outcome = loop {
        tokio::select! {
            outcome = &mut finished => break outcome,
            Some(event) = events.recv() => log_event(&event),
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!("Failed to listen for Ctrl-C: {e}");
                }
                tracing::info!("Cancelling");
                workspace.coordinator().cancel();
            }
        }
    };
    while let Ok(event) = events.try_recv() {
        log_event(&event);
    }

    match outcome {
        SessionOutcome::Completed { loaded, failed } => {
            tracing::info!(loaded, failed, "Done");
        }
        SessionOutcome::Cancelled => tracing::info!("Cancelled"),
        SessionOutcome::Aborted => {
            workspace.shutdown().await;
            anyhow::bail!("Reload session aborted");
        }
    }

    workspace.shutdown().await;
    Ok(())
}
