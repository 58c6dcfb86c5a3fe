//! Blob storage for filevault.
//!
//! Raw bytes live on disk in one directory per owner:
//! ```text
//! {base_path}/
//! ├── 1/
//! │   ├── ab12cd34-5678-90ab-cdef-123456789012.png
//! │   └── cd90ab12-3456-7890-abcd-ef1234567890.bin
//! └── 2/
//!     └── ...
//! ```
//! The physical reference handed back to callers is the path relative to the
//! base directory (`"1/ab12cd34-....png"`). The store knows nothing about the
//! tree; keeping exactly one node per blob is the file service's job.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::{Result, VaultError};

/// Longest extension kept from a suggested name.
const MAX_EXTENSION_LENGTH: usize = 16;

/// Raw byte storage addressed by owner and assigned name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Durably store `content` for `owner_id` and return its physical reference.
    ///
    /// Two saves never return the same reference, even for identical names.
    async fn save(&self, owner_id: i64, content: &[u8], suggested_name: &str) -> Result<String>;

    /// Read the bytes behind a physical reference.
    async fn read(&self, physical_ref: &str) -> Result<Vec<u8>>;

    /// Delete a blob. Returns `false` if nothing was there.
    async fn delete(&self, physical_ref: &str) -> Result<bool>;
}

/// Filesystem-backed [`BlobStore`].
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for blob storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Check if a blob exists.
    pub async fn exists(&self, physical_ref: &str) -> bool {
        match self.resolve(physical_ref) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Resolve a physical reference to an absolute path.
    ///
    /// Only references of the form `{owner_id}/{name}` produced by
    /// [`FileStorage::generate_stored_name`] are accepted, so a reference can
    /// never escape the owner's directory.
    pub fn resolve(&self, physical_ref: &str) -> Result<PathBuf> {
        let not_found = || VaultError::NotFound(format!("blob {physical_ref}"));

        let (owner, name) = physical_ref.split_once('/').ok_or_else(not_found)?;

        let digits = owner.strip_prefix('-').unwrap_or(owner);
        let owner_ok = !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
        let name_ok = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_');

        if !owner_ok || !name_ok {
            return Err(not_found());
        }

        Ok(self.base_path.join(owner).join(name))
    }

    /// Get the directory holding an owner's blobs.
    pub fn owner_dir(&self, owner_id: i64) -> PathBuf {
        self.base_path.join(owner_id.to_string())
    }

    /// Extract a safe file extension from a filename.
    ///
    /// Returns "bin" if no usable extension is found.
    fn extract_extension(filename: &str) -> &str {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| {
                !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_LENGTH
                    && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .unwrap_or("bin")
    }

    /// Generate a new UUID-based stored name keeping the suggested extension.
    pub fn generate_stored_name(suggested_name: &str) -> String {
        let uuid = Uuid::new_v4();
        let ext = Self::extract_extension(suggested_name);
        format!("{uuid}.{ext}")
    }

    /// Write to a temporary sibling, flush to disk, then rename into place.
    async fn write_atomic(dir: &Path, stored_name: &str, content: &[u8]) -> io::Result<()> {
        let final_path = dir.join(stored_name);
        let tmp_path = dir.join(format!(".{stored_name}.tmp"));

        let result = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(content).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp_path, &final_path).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        result
    }
}

#[async_trait]
impl BlobStore for FileStorage {
    async fn save(&self, owner_id: i64, content: &[u8], suggested_name: &str) -> Result<String> {
        let dir = self.owner_dir(owner_id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| VaultError::StorageWrite(format!("{}: {e}", dir.display())))?;

        let stored_name = Self::generate_stored_name(suggested_name);
        Self::write_atomic(&dir, &stored_name, content)
            .await
            .map_err(|e| VaultError::StorageWrite(format!("{stored_name}: {e}")))?;

        let physical_ref = format!("{owner_id}/{stored_name}");
        debug!(physical_ref = %physical_ref, bytes = content.len(), "blob saved");
        Ok(physical_ref)
    }

    async fn read(&self, physical_ref: &str) -> Result<Vec<u8>> {
        let path = self.resolve(physical_ref)?;

        match fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(format!("blob {physical_ref}")))
            }
            Err(e) => Err(VaultError::StorageRead(format!("{physical_ref}: {e}"))),
        }
    }

    async fn delete(&self, physical_ref: &str) -> Result<bool> {
        // A reference that cannot exist has nothing to delete
        let Ok(path) = self.resolve(physical_ref) else {
            return Ok(false);
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(physical_ref = %physical_ref, "blob deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VaultError::StorageDelete(format!("{physical_ref}: {e}"))),
        }
    }
}
