//! Project file identity.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectPathError {
    #[error("project path must be absolute: {}", .0.display())]
    NotAbsolute(PathBuf),
    #[error("project path has no file name: {}", .0.display())]
    NoFileName(PathBuf),
    #[error("project path has no parent directory: {}", .0.display())]
    NoDirectory(PathBuf),
}

/// A tracked project file.
///
/// Fields are private; the directory and short name are derived once at
/// construction and never disagree with `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRecord {
    path: PathBuf,
    directory: PathBuf,
    name: String,
}

impl ProjectRecord {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ProjectPathError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(ProjectPathError::NotAbsolute(path));
        }
        let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            return Err(ProjectPathError::NoFileName(path));
        };
        let Some(directory) = path.parent().map(Path::to_path_buf) else {
            return Err(ProjectPathError::NoDirectory(path));
        };
        Ok(Self {
            path,
            directory,
            name,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the project file.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name without extension (e.g. `App` for `/src/App/App.csproj`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length of the short name in UTF-16 code units, the key used to pick
    /// one project per directory.
    #[must_use]
    pub fn name_len(&self) -> usize {
        self.name.encode_utf16().count()
    }
}
