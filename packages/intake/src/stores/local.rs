//! Filesystem-backed file store.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::files::{content_hash, validate_key, FileStore};
use crate::types::input::StoredFile;

/// Stores uploads as flat files under a root directory.
///
/// `public_url` is the configured base URL joined with the key; serving
/// that URL (and guarding it) is up to the host application.
pub struct LocalFileStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStore {
    /// Create a store rooted at `root`, publishing keys under `public_base_url`.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, key: &str, bytes: Bytes) -> StoreResult<StoredFile> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::Backend(format!("file already exists: {key}")));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&bytes).await?;
        file.sync_all().await?;

        debug!(key, size = bytes.len(), "Stored upload");

        Ok(StoredFile {
            key: key.to_string(),
            path: path.to_string_lossy().into_owned(),
            public_url: format!("{}/{}", self.public_base_url, key),
            size_bytes: bytes.len() as u64,
            content_hash: content_hash(&bytes),
        })
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                kind: "file",
                id: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().join("uploads"), "/files/");

        let stored = store
            .put("1700000000000_manifest.txt", Bytes::from_static(b"Ship to Jane"))
            .await
            .unwrap();

        assert_eq!(stored.public_url, "/files/1700000000000_manifest.txt");
        assert_eq!(stored.size_bytes, 12);
        assert_eq!(
            store.get("1700000000000_manifest.txt").await.unwrap(),
            Bytes::from_static(b"Ship to Jane")
        );
    }

    #[tokio::test]
    async fn test_put_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path(), "/files");

        store.put("k.txt", Bytes::from_static(b"one")).await.unwrap();
        let err = store.put("k.txt", Bytes::from_static(b"two")).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(store.get("k.txt").await.unwrap(), Bytes::from_static(b"one"));
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path(), "/files");

        let err = store.put("../escape.txt", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert!(matches!(
            store.get("missing.txt").await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}
