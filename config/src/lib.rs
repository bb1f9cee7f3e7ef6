//! Configuration for the Quay workspace core.
//!
//! Loaded from `~/.quay/config.toml` (or the file named by `QUAY_CONFIG`).
//! Every section and field is optional; a missing file means defaults.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "QUAY_CONFIG";

/// Default cap on surfaced workspace errors per process lifetime.
pub const DEFAULT_MAX_REPORTED_ERRORS: usize = 15;

// Default value function for serde (bool::default() is false, so only true needs a fn)
pub(crate) const fn default_true() -> bool {
    true
}

fn default_project_extensions() -> Vec<String> {
    vec!["csproj".to_string()]
}

fn default_source_extensions() -> Vec<String> {
    vec!["cs".to_string()]
}

const fn default_max_reported_errors() -> usize {
    DEFAULT_MAX_REPORTED_ERRORS
}

fn default_restore_command() -> String {
    "dotnet".to_string()
}

fn default_restore_args() -> Vec<String> {
    vec!["restore".to_string()]
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct QuayConfig {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub restore: RestoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Extensions of project files discovered in workspace folders.
    #[serde(default = "default_project_extensions")]
    pub project_extensions: Vec<String>,
    /// Glob patterns; matching project paths are never tracked.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Run the restore tool before loading each project. Default: true.
    #[serde(default = "default_true")]
    pub restore_before_load: bool,
    /// Ask the engine to compile each project right after it loads.
    #[serde(default)]
    pub compile_after_load: bool,
    /// Cap on surfaced load/restore failures. Default: 15.
    #[serde(default = "default_max_reported_errors")]
    pub max_reported_errors: usize,
    /// Extensions of documents the directory engine loads.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            project_extensions: default_project_extensions(),
            exclude_patterns: Vec::new(),
            restore_before_load: true,
            compile_after_load: false,
            max_reported_errors: DEFAULT_MAX_REPORTED_ERRORS,
            source_extensions: default_source_extensions(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestoreConfig {
    /// Restore executable. Default: `dotnet`.
    #[serde(default = "default_restore_command")]
    pub command: String,
    /// Arguments placed before the project path. Default: `["restore"]`.
    #[serde(default = "default_restore_args")]
    pub args: Vec<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            command: default_restore_command(),
            args: default_restore_args(),
            timeout_secs: None,
        }
    }
}

impl RestoreConfig {
    /// Command with `${VAR}` references expanded from the environment.
    #[must_use]
    pub fn resolved_command(&self) -> String {
        expand_env_vars(&self.command)
    }

    #[must_use]
    pub fn resolved_args(&self) -> Vec<String> {
        self.args.iter().map(|a| expand_env_vars(a)).collect()
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Expand `${VAR}` references. Unset variables expand to the empty string;
/// an unterminated `${` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl QuayConfig {
    /// Load from the default location. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".quay").join("config.toml"))
}
