//! Backend trait for filesystem operations

use super::error::StorageError;
use async_trait::async_trait;
use std::path::Path;

/// Abstraction over filesystem operations to support multiple backends
#[async_trait]
pub trait AssetBackend: Send + Sync {
    /// Whether a file exists at `path`
    async fn exists(&self, path: &Path) -> Result<bool, StorageError>;

    /// Create directory and all parent directories
    async fn create_dir_all(&self, path: &Path) -> Result<(), StorageError>;

    /// Delete a file. Returns whether a file was actually removed; a missing
    /// file is not an error.
    async fn remove_file(&self, path: &Path) -> Result<bool, StorageError>;

    /// Move `from` to `to`, replacing `to` atomically when both are on the
    /// same filesystem
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError>;
}
