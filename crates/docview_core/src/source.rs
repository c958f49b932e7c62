//! Access to the persisted document content.

use crate::document::DocumentKey;
use std::io::ErrorKind;
use std::time::{Duration, SystemTime};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source not found")]
    NotFound,

    #[error("source operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SourceError {
    fn from_io(err: std::io::Error) -> Self {
        if err.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(err)
        }
    }
}

/// Persisted document storage, typically the filesystem.
#[async_trait::async_trait]
pub trait SourceStore: Send + Sync {
    /// Returns the raw bytes of the document.
    async fn read_content(&self, key: &DocumentKey) -> Result<Vec<u8>, SourceError>;

    async fn write_content(&self, key: &DocumentKey, content: &[u8]) -> Result<(), SourceError>;

    /// Returns the time the document was last modified.
    async fn last_modified(&self, key: &DocumentKey) -> Result<SystemTime, SourceError>;
}

/// [`SourceStore`] backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct FsSourceStore {
    timeout: Duration,
}

impl Default for FsSourceStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000))
    }
}

impl FsSourceStore {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = std::io::Result<T>>,
    ) -> Result<T, SourceError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(SourceError::from_io),
            Err(_) => Err(SourceError::Timeout(self.timeout)),
        }
    }
}

#[async_trait::async_trait]
impl SourceStore for FsSourceStore {
    async fn read_content(&self, key: &DocumentKey) -> Result<Vec<u8>, SourceError> {
        let bytes = self.with_timeout(tokio::fs::read(key.path())).await?;
        tracing::trace!(%key, bytes = bytes.len(), "Read source");
        Ok(bytes)
    }

    async fn write_content(&self, key: &DocumentKey, content: &[u8]) -> Result<(), SourceError> {
        self.with_timeout(tokio::fs::write(key.path(), content))
            .await
    }

    async fn last_modified(&self, key: &DocumentKey) -> Result<SystemTime, SourceError> {
        let metadata = self.with_timeout(tokio::fs::metadata(key.path())).await?;
        Ok(metadata.modified()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new(dir.path().join("notes.md"));
        let store = FsSourceStore::default();

        assert!(matches!(
            store.read_content(&key).await,
            Err(SourceError::NotFound)
        ));
        assert!(matches!(
            store.last_modified(&key).await,
            Err(SourceError::NotFound)
        ));

        store.write_content(&key, b"# Notes\n").await.unwrap();
        assert_eq!(store.read_content(&key).await.unwrap(), b"# Notes\n");
        assert!(store.last_modified(&key).await.is_ok());
    }

    #[tokio::test]
    async fn test_reading_a_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new(dir.path().to_path_buf());
        let err = FsSourceStore::default().read_content(&key).await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
