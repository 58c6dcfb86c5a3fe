//! Error types for filevault.

use std::fmt;

use thiserror::Error;

/// Stable classification of a [`VaultError`].
///
/// The string form is part of the public API surface and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Forbidden,
    Conflict,
    PayloadTooLarge,
    StorageWrite,
    StorageRead,
    StorageDelete,
    MetadataWrite,
    Database,
    Auth,
    Config,
    Io,
}

impl ErrorKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::StorageWrite => "storage_write_error",
            ErrorKind::StorageRead => "storage_read_error",
            ErrorKind::StorageDelete => "storage_delete_error",
            ErrorKind::MetadataWrite => "metadata_write_error",
            ErrorKind::Database => "database_error",
            ErrorKind::Auth => "auth_error",
            ErrorKind::Config => "config_error",
            ErrorKind::Io => "io_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common error type for filevault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Malformed input (empty name, fetching a folder's content, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Node, parent or blob does not resolve.
    #[error("{0} not found")]
    NotFound(String),

    /// The node belongs to another owner.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Duplicate folder name or non-empty folder on delete.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Upload exceeds the configured ceiling.
    #[error("payload too large: {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Blob store write failure.
    #[error("storage write error: {0}")]
    StorageWrite(String),

    /// Blob store read failure.
    #[error("storage read error: {0}")]
    StorageRead(String),

    /// Blob store delete failure.
    #[error("storage delete error: {0}")]
    StorageDelete(String),

    /// Metadata persistence failure.
    #[error("metadata write error: {0}")]
    MetadataWrite(String),

    /// Database error.
    ///
    /// Read-side failures of the metadata store; errors from sqlx are
    /// converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Get the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            VaultError::NotFound(_) => ErrorKind::NotFound,
            VaultError::Forbidden(_) => ErrorKind::Forbidden,
            VaultError::Conflict(_) => ErrorKind::Conflict,
            VaultError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            VaultError::StorageWrite(_) => ErrorKind::StorageWrite,
            VaultError::StorageRead(_) => ErrorKind::StorageRead,
            VaultError::StorageDelete(_) => ErrorKind::StorageDelete,
            VaultError::MetadataWrite(_) => ErrorKind::MetadataWrite,
            VaultError::Database(_) | VaultError::DatabaseConnection(_) => ErrorKind::Database,
            VaultError::Io(_) => ErrorKind::Io,
            VaultError::Auth(_) => ErrorKind::Auth,
            VaultError::Config(_) => ErrorKind::Config,
        }
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for VaultError {
    fn from(e: sqlx::Error) -> Self {
        VaultError::Database(e.to_string())
    }
}

/// Result type alias for filevault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
