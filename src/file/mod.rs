//! File tree for filevault.
//!
//! This module provides per-owner file and folder management including:
//! - Node metadata (files and folders) persisted in SQLite
//! - Blob storage on the local filesystem with UUID naming
//! - Ownership checks
//! - The service that keeps the two stores consistent

mod access;
mod node;
mod repository;
mod service;
mod storage;

pub use access::assert_ownership;
pub use node::{NewNode, Node, NodeKind, NodeUpdate, ParseNodeKindError};
pub use repository::{MetadataStore, NodeRepository};
pub use service::{
    split_extension, validate_name, FileContent, FileService, UploadRequest,
    FALLBACK_CONTENT_TYPE,
};
pub use storage::{BlobStore, FileStorage};

/// Maximum length for a node name (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Default maximum file size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
