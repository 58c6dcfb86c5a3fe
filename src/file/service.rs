//! File service for filevault.
//!
//! Orchestrates the metadata store and the blob store. Two write orderings
//! bound the inconsistency between them:
//! - upload writes the blob before inserting metadata, so a record never
//!   points at missing bytes (a failure can at worst leak a blob);
//! - delete removes the blob before the record, and keeps the record when the
//!   blob cannot be removed.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::{Result, VaultError};

use super::access::assert_ownership;
use super::node::{NewNode, Node, NodeKind, NodeUpdate};
use super::repository::{MetadataStore, NodeRepository};
use super::storage::{BlobStore, FileStorage};
use super::{DEFAULT_MAX_FILE_SIZE, MAX_NAME_LENGTH};

/// Content type recorded when the uploader supplies none and the name gives no hint.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Request data for file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Folder to upload into (None for the root).
    pub parent_id: Option<i64>,
    /// Original filename.
    pub name: String,
    /// Content type supplied by the uploader.
    pub content_type: Option<String>,
    /// Declared size; defaults to the content length.
    pub size: Option<u64>,
    /// File content.
    pub content: Vec<u8>,
}

impl UploadRequest {
    /// Create a new upload request into the root folder.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            parent_id: None,
            name: name.into(),
            content_type: None,
            size: None,
            content,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: Option<i64>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the declared size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// Bytes of a file together with the metadata needed to serve them.
#[derive(Debug)]
pub struct FileContent {
    /// The file node.
    pub node: Node,
    /// File content.
    pub content: Vec<u8>,
}

impl FileContent {
    /// Display name of the file.
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Content type recorded at upload, else one guessed from the name.
    pub fn content_type(&self) -> Cow<'_, str> {
        match self.node.content_type.as_deref().filter(|ct| !ct.is_empty()) {
            Some(ct) => Cow::Borrowed(ct),
            None => Cow::Owned(
                mime_guess::from_path(&self.node.name)
                    .first_or_octet_stream()
                    .to_string(),
            ),
        }
    }
}

/// Trim and validate a node name.
///
/// Names must be non-empty after trimming, at most [`MAX_NAME_LENGTH`]
/// characters, free of path separators and control characters, and not `.`
/// or `..`.
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(VaultError::InvalidArgument("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(VaultError::InvalidArgument(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if name == "." || name == ".." {
        return Err(VaultError::InvalidArgument(format!("'{name}' is not a valid name")));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(VaultError::InvalidArgument(
            "name must not contain path separators or control characters".to_string(),
        ));
    }

    Ok(name.to_string())
}

/// Split a file name into stem and extension (including the dot).
///
/// A leading dot does not start an extension, so `.bashrc` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// File service implementing the tree operations.
#[derive(Clone)]
pub struct FileService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    max_file_size: u64,
}

impl FileService {
    /// Create a new FileService over explicit stores.
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            metadata,
            blobs,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Create a FileService backed by SQLite metadata and on-disk blobs.
    pub fn with_database(db: &Database, storage: FileStorage) -> Self {
        Self::new(
            Arc::new(NodeRepository::new(db.pool())),
            Arc::new(storage),
        )
    }

    /// Set a custom max file size.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Get the configured max file size.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Load a node and confirm the caller owns it.
    async fn resolve_owned(&self, owner_id: i64, node_id: i64) -> Result<Node> {
        let node = self
            .metadata
            .find_by_id(node_id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("node {node_id}")))?;

        assert_ownership(owner_id, &node)?;
        Ok(node)
    }

    /// Load a parent folder, confirming ownership and kind.
    async fn resolve_parent(&self, owner_id: i64, parent_id: i64) -> Result<Node> {
        let parent = self
            .metadata
            .find_by_id(parent_id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("parent folder {parent_id}")))?;

        assert_ownership(owner_id, &parent)?;

        if !parent.is_folder() {
            return Err(VaultError::NotFound(format!("parent folder {parent_id}")));
        }
        Ok(parent)
    }

    /// Create a folder.
    ///
    /// Fails with `Conflict` if the owner already has a folder of that name
    /// under the same parent. The check is repeated atomically by the
    /// metadata store at insertion, so concurrent callers get exactly one
    /// success.
    pub async fn create_folder(
        &self,
        owner_id: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<Node> {
        let name = validate_name(name)?;

        if let Some(pid) = parent_id {
            self.resolve_parent(owner_id, pid).await?;
        }

        if self
            .metadata
            .find_by_name_in_parent(owner_id, parent_id, &name, NodeKind::Folder)
            .await?
            .is_some()
        {
            return Err(VaultError::Conflict("folder already exists".to_string()));
        }

        let folder = self
            .metadata
            .insert(&NewNode::folder(owner_id, name).with_parent(parent_id))
            .await?;

        info!(owner_id, folder_id = folder.id, name = %folder.name, "folder created");
        Ok(folder)
    }

    /// Upload a file.
    ///
    /// # Validation
    /// - Content: at most the configured max size (default 10MB)
    /// - Name: see [`validate_name`]
    ///
    /// # Returns
    /// The created file node.
    pub async fn upload_file(&self, owner_id: i64, request: UploadRequest) -> Result<Node> {
        let actual_size = request.content.len() as u64;
        if actual_size > self.max_file_size {
            return Err(VaultError::PayloadTooLarge {
                size: actual_size,
                max: self.max_file_size,
            });
        }

        let name = validate_name(&request.name)?;

        if let Some(pid) = request.parent_id {
            self.resolve_parent(owner_id, pid).await?;
        }

        let content_type = request
            .content_type
            .map(|ct| ct.trim().to_string())
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&name)
                    .first_raw()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string()
            });
        let size = request.size.unwrap_or(actual_size);
        let size = i64::try_from(size).map_err(|_| {
            VaultError::InvalidArgument(format!("declared size {size} is out of range"))
        })?;

        // Bytes first: metadata must never point at a blob that does not exist
        let physical_ref = self.blobs.save(owner_id, &request.content, &name).await?;

        let new_node = NewNode::file(owner_id, name, physical_ref.as_str(), size, content_type)
            .with_parent(request.parent_id);

        let file = match self.metadata.insert(&new_node).await {
            Ok(file) => file,
            Err(e) => {
                warn!(owner_id, error = %e, "metadata insert failed after blob write, removing blob");
                if let Err(cleanup) = self.blobs.delete(&physical_ref).await {
                    warn!(physical_ref = %physical_ref, error = %cleanup, "orphaned blob left behind");
                }
                return Err(e);
            }
        };

        info!(owner_id, file_id = file.id, name = %file.name, size, "file uploaded");
        Ok(file)
    }

    /// List the direct children of a folder (None for the root).
    pub async fn list_children(&self, owner_id: i64, parent_id: Option<i64>) -> Result<Vec<Node>> {
        if let Some(pid) = parent_id {
            self.resolve_parent(owner_id, pid).await?;
        }

        self.metadata.find_children(owner_id, parent_id).await
    }

    /// List every node the owner has.
    pub async fn list_all(&self, owner_id: i64) -> Result<Vec<Node>> {
        self.metadata.find_by_owner(owner_id).await
    }

    /// Get a single node's metadata.
    pub async fn get_node(&self, owner_id: i64, node_id: i64) -> Result<Node> {
        self.resolve_owned(owner_id, node_id).await
    }

    /// Rename a node.
    ///
    /// For files `new_name` is the stem only; the original extension is
    /// always kept so a rename can never change how the file is interpreted.
    pub async fn rename(&self, owner_id: i64, node_id: i64, new_name: &str) -> Result<Node> {
        let node = self.resolve_owned(owner_id, node_id).await?;

        let stem = new_name.trim();
        if stem.is_empty() {
            return Err(VaultError::InvalidArgument("new name is required".to_string()));
        }

        let name = match node.kind {
            NodeKind::File => {
                let (_, ext) = split_extension(&node.name);
                validate_name(&format!("{stem}{ext}"))?
            }
            NodeKind::Folder => validate_name(stem)?,
        };

        if node.is_folder() {
            if let Some(existing) = self
                .metadata
                .find_by_name_in_parent(owner_id, node.parent_id, &name, NodeKind::Folder)
                .await?
            {
                if existing.id != node.id {
                    return Err(VaultError::Conflict("folder already exists".to_string()));
                }
            }
        }

        let updated = self
            .metadata
            .update(node.id, &NodeUpdate::new().name(name))
            .await?;

        debug!(owner_id, node_id, from = %node.name, to = %updated.name, "node renamed");
        Ok(updated)
    }

    /// Delete a node.
    ///
    /// Folders must be empty; deletion never cascades. For files the blob is
    /// removed first, and a blob that cannot be removed leaves the record in
    /// place.
    pub async fn delete(&self, owner_id: i64, node_id: i64) -> Result<()> {
        let node = self.resolve_owned(owner_id, node_id).await?;

        match node.kind {
            NodeKind::Folder => {
                let children = self.metadata.find_children(owner_id, Some(node.id)).await?;
                if !children.is_empty() {
                    return Err(VaultError::Conflict("folder is not empty".to_string()));
                }
            }
            NodeKind::File => {
                if let Some(ref physical_ref) = node.physical_ref {
                    self.blobs.delete(physical_ref).await?;
                }
            }
        }

        self.metadata.remove(node.id).await?;

        info!(owner_id, node_id, kind = %node.kind, "node deleted");
        Ok(())
    }

    /// Fetch a file's bytes.
    pub async fn fetch_content(&self, owner_id: i64, node_id: i64) -> Result<FileContent> {
        let node = self.resolve_owned(owner_id, node_id).await?;

        if !node.is_file() {
            return Err(VaultError::InvalidArgument(format!(
                "node {node_id} is a folder"
            )));
        }

        let physical_ref = node
            .physical_ref
            .as_deref()
            .ok_or_else(|| VaultError::NotFound(format!("content of node {node_id}")))?;

        let content = self.blobs.read(physical_ref).await?;

        Ok(FileContent { node, content })
    }
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService")
            .field("max_file_size", &self.max_file_size)
            .finish_non_exhaustive()
    }
}
