use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<StoreError> for crate::errors::ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(k) => crate::errors::ServiceError::NotFound(format!("document blob {k}")),
            other => crate::errors::ServiceError::Storage(other.to_string()),
        }
    }
}

/// Blob storage for uploaded documents, addressed by relative keys.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    /// Returns `false` if nothing was stored under `key`.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Keys are relative paths made of normal components only.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('\\') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    let ok = Path::new(key).components().all(|c| matches!(c, Component::Normal(_)));
    if !ok {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Stores blobs as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| StoreError::Io(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| StoreError::Io(e.to_string()))?;
        debug!(event = "blob_written", key, size = bytes.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(b) => Ok(b),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}

/// In-memory store for tests
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// # Examples
    /// ```
    /// use service::documents::{store::mock::MemoryDocumentStore, DocumentStore};
    /// let store = MemoryDocumentStore::default();
    /// tokio_test::block_on(store.put("u/notes.txt", b"rent")).unwrap();
    /// assert_eq!(tokio_test::block_on(store.get("u/notes.txt")).unwrap(), b"rent");
    /// assert!(tokio_test::block_on(store.delete("u/notes.txt")).unwrap());
    /// assert!(store.is_empty());
    /// ```
    #[derive(Default)]
    pub struct MemoryDocumentStore {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryDocumentStore {
        pub fn len(&self) -> usize { self.blobs.lock().map(|b| b.len()).unwrap_or(0) }
        pub fn is_empty(&self) -> bool { self.len() == 0 }
    }

    #[async_trait]
    impl DocumentStore for MemoryDocumentStore {
        async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
            validate_key(key)?;
            let mut blobs = self.blobs.lock().map_err(|e| StoreError::Io(e.to_string()))?;
            blobs.insert(key.to_string(), bytes.to_vec());
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            let blobs = self.blobs.lock().map_err(|e| StoreError::Io(e.to_string()))?;
            blobs.get(key).cloned().ok_or_else(|| StoreError::NotFound(key.to_string()))
        }

        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            let mut blobs = self.blobs.lock().map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(blobs.remove(key).is_some())
        }
    }
}
