//! Response DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::file::Node;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// A file or folder as seen by API callers.
///
/// The blob's physical reference is never exposed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NodeResponse {
    /// Node ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// "file" or "folder".
    pub kind: String,
    /// Parent folder ID (absent for root nodes).
    pub parent_id: Option<i64>,
    /// Size in bytes (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Content type (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Node> for NodeResponse {
    fn from(node: Node) -> Self {
        Self {
            id: node.id,
            name: node.name,
            kind: node.kind.to_string(),
            parent_id: node.parent_id,
            size: node.size,
            content_type: node.content_type,
            created_at: node.created_at,
        }
    }
}
