//! Node types for the file tree.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Kind of a node. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

impl NodeKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Folder => "folder",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored kind string is not recognised.
#[derive(Debug, Error)]
#[error("unknown node kind: {0}")]
pub struct ParseNodeKindError(String);

impl FromStr for NodeKind {
    type Err = ParseNodeKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(NodeKind::File),
            "folder" => Ok(NodeKind::Folder),
            other => Err(ParseNodeKindError(other.to_string())),
        }
    }
}

impl TryFrom<String> for NodeKind {
    type Error = ParseNodeKindError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A file or folder in an owner's tree.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Node {
    /// Unique node ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// File or folder.
    #[sqlx(try_from = "String")]
    pub kind: NodeKind,
    /// Parent folder ID (None for root nodes).
    pub parent_id: Option<i64>,
    /// Owner identity.
    pub owner_id: i64,
    /// Blob locator (files only). Never exposed to API callers.
    pub physical_ref: Option<String>,
    /// Size in bytes as supplied at upload (files only).
    pub size: Option<i64>,
    /// Content type as supplied at upload (files only).
    pub content_type: Option<String>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// Data for inserting a new node.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub name: String,
    pub kind: NodeKind,
    pub parent_id: Option<i64>,
    pub owner_id: i64,
    pub physical_ref: Option<String>,
    pub size: Option<i64>,
    pub content_type: Option<String>,
    /// Creation time; the store assigns the current time when absent.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewNode {
    /// Create a new folder node.
    pub fn folder(owner_id: i64, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Folder,
            parent_id: None,
            owner_id,
            physical_ref: None,
            size: None,
            content_type: None,
            created_at: None,
        }
    }

    /// Create a new file node pointing at an already-stored blob.
    pub fn file(
        owner_id: i64,
        name: impl Into<String>,
        physical_ref: impl Into<String>,
        size: i64,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
            parent_id: None,
            owner_id,
            physical_ref: Some(physical_ref.into()),
            size: Some(size),
            content_type: Some(content_type.into()),
            created_at: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: Option<i64>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set an explicit creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Partial update of a node.
///
/// Only the name is mutable; kind, parent, owner and physical fields are fixed
/// at creation.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub name: Option<String>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}
