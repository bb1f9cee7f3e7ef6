//! External dependency restore.
//!
//! Runs the configured restore tool (`dotnet restore <project>` by default)
//! as a child process. A nonzero exit is an ordinary outcome, not an error;
//! cancellation kills the child and is reported separately.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use quay_config::RestoreConfig;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Restore future type alias.
pub type RestoreFut<'a> =
    Pin<Box<dyn Future<Output = Result<RestoreOutcome, RestoreError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Succeeded,
    /// The tool ran and exited unsuccessfully. `exit_code` is `None` when the
    /// process was terminated by a signal.
    Failed {
        exit_code: Option<i32>,
        output: String,
    },
}

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("restore cancelled")]
    Cancelled,
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("restore timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("failed waiting for restore: {0}")]
    Io(#[from] std::io::Error),
}

pub trait RestoreTool: Send + Sync {
    /// Restore `project`. Must return [`RestoreError::Cancelled`] promptly
    /// once `cancel` fires.
    fn restore<'a>(&'a self, project: &'a Path, cancel: &'a CancellationToken) -> RestoreFut<'a>;
}

/// Restore by spawning an external command per project.
#[derive(Debug, Clone)]
pub struct CommandRestoreRunner {
    command: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandRestoreRunner {
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Option<Duration>) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &RestoreConfig) -> Self {
        Self::new(
            config.resolved_command(),
            config.resolved_args(),
            config.timeout(),
        )
    }

    async fn run(
        &self,
        project: &Path,
        cancel: &CancellationToken,
    ) -> Result<RestoreOutcome, RestoreError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg(project)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = project.parent() {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| RestoreError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        // Dropping the wait future drops the child, and kill_on_drop kills it.
        let wait = child.wait_with_output();
        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(project = %project.display(), "Restore cancelled, killing child");
                return Err(RestoreError::Cancelled);
            }
            result = with_timeout(self.timeout, wait) => result?,
        }?;

        if output.status.success() {
            return Ok(RestoreOutcome::Succeeded);
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(RestoreOutcome::Failed {
            exit_code: output.status.code(),
            output: text.trim().to_string(),
        })
    }
}

async fn with_timeout<F: Future>(
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output, RestoreError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| RestoreError::TimedOut(limit)),
        None => Ok(fut.await),
    }
}

impl RestoreTool for CommandRestoreRunner {
    fn restore<'a>(&'a self, project: &'a Path, cancel: &'a CancellationToken) -> RestoreFut<'a> {
        Box::pin(self.run(project, cancel))
    }
}

/// User-facing message for a failed restore of the project named `name`.
#[must_use]
pub fn restore_failure_message(name: &str, exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("Failed to restore {name}. Error code {code}."),
        None => format!("Failed to restore {name}. Process was terminated."),
    }
}
