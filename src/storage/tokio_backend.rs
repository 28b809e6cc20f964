//! Tokio-based filesystem backend (portable, works on all platforms)

use super::backend::AssetBackend;
use super::error::StorageError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;

/// Portable filesystem backend using tokio::fs
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFsBackend;

impl TokioFsBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AssetBackend for TokioFsBackend {
    async fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<bool, StorageError> {
        // Idempotent: a missing file counts as removed
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        tokio::fs::rename(from, to).await?;
        Ok(())
    }
}
