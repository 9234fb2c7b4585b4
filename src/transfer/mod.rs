// Transfer endpoint storage: opaque bytes keyed by a freshly minted file id

use crate::core::errors::RelayError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Mint a new file identifier (v4 UUID)
pub fn new_file_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, file_id: &str, bytes: &[u8]) -> Result<(), RelayError>;
}

/// Stores each upload as `<root>/<file_id>`
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open the store, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RelayError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            RelayError::Storage(format!("Failed to create upload directory {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, file_id: &str) -> Result<PathBuf, RelayError> {
        // ids are minted here, but never let one escape the root
        if file_id.is_empty() || file_id.contains(['/', '\\']) || file_id.starts_with('.') {
            return Err(RelayError::InvalidInput(format!("Invalid file id '{}'", file_id)));
        }
        Ok(self.root.join(file_id))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, file_id: &str, bytes: &[u8]) -> Result<(), RelayError> {
        let path = self.path_for(file_id)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| RelayError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;
        debug!(file_id = %file_id, size = bytes.len(), path = %path.display(), "Blob stored");
        Ok(())
    }
}
