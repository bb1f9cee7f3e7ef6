//! Immutable workspace snapshots.
//!
//! A [`WorkspaceSnapshot`] is a point-in-time view of every loaded project and
//! its documents. Snapshots are shared behind `Arc` and replaced wholesale;
//! nothing mutates a snapshot after it has been published.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
use url::Url;

/// Identity of a document: its absolute path on disk.
///
/// Serializes as a `file://` URI, the form protocol clients exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(PathBuf);

impl DocumentId {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// `file://` URI for protocol clients. `None` for non-absolute paths.
    #[must_use]
    pub fn uri(&self) -> Option<Url> {
        Url::from_file_path(&self.0).ok()
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let uri = self.uri().ok_or_else(|| {
            ser::Error::custom(format!("document path is not absolute: {self}"))
        })?;
        serializer.serialize_str(uri.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let uri = Url::parse(&raw).map_err(de::Error::custom)?;
        if uri.scheme() != "file" {
            return Err(de::Error::custom(format!("not a file URI: {raw}")));
        }
        uri.to_file_path()
            .map(Self)
            .map_err(|()| de::Error::custom(format!("not a local file URI: {raw}")))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: DocumentId,
    text: Arc<str>,
}

impl Document {
    #[must_use]
    pub fn new(id: DocumentId, text: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Same document with new content. The id is kept.
    #[must_use]
    pub fn with_text(&self, text: impl Into<Arc<str>>) -> Self {
        Self {
            id: self.id.clone(),
            text: text.into(),
        }
    }
}

/// One loaded project and its documents, in load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSnapshot {
    path: PathBuf,
    documents: IndexMap<DocumentId, Document>,
}

impl ProjectSnapshot {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            path: path.into(),
            documents: documents
                .into_iter()
                .map(|doc| (doc.id().clone(), doc))
                .collect(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn document(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    projects: IndexMap<PathBuf, ProjectSnapshot>,
}

impl WorkspaceSnapshot {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    #[must_use]
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.projects
            .values()
            .map(|p| p.documents.len())
            .sum()
    }

    #[must_use]
    pub fn contains_project(&self, path: &Path) -> bool {
        self.projects.contains_key(path)
    }

    #[must_use]
    pub fn project(&self, path: &Path) -> Option<&ProjectSnapshot> {
        self.projects.get(path)
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectSnapshot> {
        self.projects.values()
    }

    /// Look a document up across all projects. The first project that
    /// contains it wins.
    #[must_use]
    pub fn document(&self, id: &DocumentId) -> Option<&Document> {
        self.projects.values().find_map(|p| p.document(id))
    }

    /// All documents in project order, then document order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.projects.values().flat_map(ProjectSnapshot::documents)
    }

    /// New snapshot with `project` added or replaced. Replacement keeps the
    /// project's original position.
    #[must_use]
    pub fn with_project(&self, project: ProjectSnapshot) -> Self {
        let mut projects = self.projects.clone();
        projects.insert(project.path.clone(), project);
        Self { projects }
    }

    /// New snapshot where the document's text is replaced in whichever
    /// project holds it. Unknown ids leave the snapshot unchanged.
    #[must_use]
    pub fn with_document_text(&self, id: &DocumentId, text: impl Into<Arc<str>>) -> Self {
        let mut projects = self.projects.clone();
        if let Some(project) = projects.values_mut().find(|p| p.documents.contains_key(id))
            && let Some(doc) = project.documents.get_mut(id)
        {
            *doc = doc.with_text(text);
        }
        Self { projects }
    }
}
