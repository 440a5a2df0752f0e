//! Binary storage for uploaded case documents
//!
//! Document metadata lives in the store; the bytes go through this seam.
//! The local filesystem implementation is sufficient for single-node
//! deployments, with `file://` references recorded against each document.

use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob reference: {0}")]
    InvalidRef(String),

    #[error("Blob not found: {0}")]
    NotFound(String),
}

/// Byte storage for document content, keyed on upload and addressed by the
/// returned reference thereafter
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store content under a key; returns the reference to record
    async fn store(&self, key: &str, content: &[u8]) -> Result<String, BlobStoreError>;

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError>;

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError>;

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError>;
}

/// Filesystem-backed store rooted at an upload directory
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_from_ref(&self, blob_ref: &str) -> Result<PathBuf, BlobStoreError> {
        blob_ref
            .strip_prefix("file://")
            .map(PathBuf::from)
            .ok_or_else(|| {
                BlobStoreError::InvalidRef(format!("Expected file:// prefix: {blob_ref}"))
            })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, key: &str, content: &[u8]) -> Result<String, BlobStoreError> {
        let path = self.base_path.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(format!("file://{}", path.display()))
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if !path.exists() {
            return Err(BlobStoreError::NotFound(blob_ref.to_string()));
        }
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        Ok(path.exists())
    }
}

/// In-memory store used by tests
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, key: &str, content: &[u8]) -> Result<String, BlobStoreError> {
        let blob_ref = format!("memory://{key}");
        self.blobs
            .write()
            .await
            .insert(blob_ref.clone(), content.to_vec());
        Ok(blob_ref)
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        self.blobs
            .read()
            .await
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(blob_ref.to_string()))
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        self.blobs.write().await.remove(blob_ref);
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        Ok(self.blobs.read().await.contains_key(blob_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let blob_ref = store
            .store("DBT-2024-SOUTHDELHI-001/fir.pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert!(blob_ref.starts_with("file://"));
        assert!(store.exists(&blob_ref).await.unwrap());
        assert_eq!(store.fetch(&blob_ref).await.unwrap(), b"%PDF-1.4");

        store.delete(&blob_ref).await.unwrap();
        assert!(!store.exists(&blob_ref).await.unwrap());
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let store = MemoryBlobStore::new();
        let result = store.fetch("memory://nope").await;
        assert!(matches!(result, Err(BlobStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn bad_reference_scheme_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let result = store.fetch("s3://bucket/key").await;
        assert!(matches!(result, Err(BlobStoreError::InvalidRef(_))));
    }
}
