//! Tracked project set.
//!
//! Holds at most one project per directory. When a directory holds several
//! project files, the one with the shortest name wins (first seen on ties)
//! and the others are silently dropped.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use indexmap::IndexMap;
use quay_types::ProjectRecord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectSetError {
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },
}

#[derive(Debug)]
pub struct ProjectSet {
    /// Keyed by containing directory, in insertion order.
    projects: IndexMap<PathBuf, ProjectRecord>,
    exclude: GlobSet,
    project_extensions: Vec<String>,
}

impl ProjectSet {
    pub fn new(
        exclude_patterns: &[String],
        project_extensions: Vec<String>,
    ) -> Result<Self, ProjectSetError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude_patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| ProjectSetError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        let exclude = builder
            .build()
            .map_err(|source| ProjectSetError::InvalidPattern {
                pattern: exclude_patterns.join(", "),
                source,
            })?;
        Ok(Self {
            projects: IndexMap::new(),
            exclude,
            project_extensions,
        })
    }

    /// Track the given project files.
    ///
    /// Paths are grouped by directory and only the shortest-named file of
    /// each group is considered. A directory already tracked keeps its
    /// current project unless the newcomer's name is strictly shorter.
    /// Returns the number of entries inserted or replaced.
    pub fn add_projects<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut winners: IndexMap<PathBuf, ProjectRecord> = IndexMap::new();
        for path in paths {
            let path = path.as_ref();
            if self.exclude.is_match(path) {
                tracing::debug!(path = %path.display(), "Project excluded by pattern");
                continue;
            }
            let record = match ProjectRecord::new(path) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Ignoring project path: {e}");
                    continue;
                }
            };
            match winners.get(record.directory()) {
                Some(current) if current.name_len() <= record.name_len() => {}
                _ => {
                    winners.insert(record.directory().to_path_buf(), record);
                }
            }
        }

        let mut changed = 0;
        for (directory, record) in winners {
            match self.projects.get(&directory) {
                Some(current) if current.name_len() <= record.name_len() => {
                    if current.path() != record.path() {
                        tracing::debug!(
                            kept = %current.path().display(),
                            dropped = %record.path().display(),
                            "Directory already has a project"
                        );
                    }
                }
                _ => {
                    tracing::debug!(path = %record.path().display(), "Tracking project");
                    self.projects.insert(directory, record);
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Stop tracking exact path matches. Returns the number removed.
    pub fn remove_projects<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut removed = 0;
        for path in paths {
            let path = path.as_ref();
            let Some(directory) = path.parent() else {
                continue;
            };
            if self
                .projects
                .get(directory)
                .is_some_and(|record| record.path() == path)
            {
                self.projects.shift_remove(directory);
                removed += 1;
            }
        }
        removed
    }

    /// Project files under `folder` with a configured project extension.
    ///
    /// Hidden entries and gitignored paths are skipped. A missing folder
    /// yields nothing.
    #[must_use]
    pub fn discover(&self, folder: &Path) -> Vec<PathBuf> {
        if !folder.is_dir() {
            tracing::debug!(folder = %folder.display(), "Skipping missing workspace folder");
            return Vec::new();
        }
        WalkBuilder::new(folder)
            .hidden(true)
            .git_ignore(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|path| self.is_project_file(path))
            .collect()
    }

    fn is_project_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.project_extensions.iter().any(|p| p == ext))
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        path.parent()
            .and_then(|dir| self.projects.get(dir))
            .is_some_and(|record| record.path() == path)
    }

    /// Tracked projects in insertion order.
    #[must_use]
    pub fn tracked(&self) -> Vec<ProjectRecord> {
        self.projects.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
