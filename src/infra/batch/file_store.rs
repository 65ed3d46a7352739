use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::batch::{ArtifactStore, BatchError};

/// Artifact store on the local filesystem: one file per artifact name inside
/// a fixed directory. Useful when the updater runs somewhere with a persistent
/// disk and Drive-side checkpoint storage is not wanted.
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn create_or_overwrite(&self, name: &str, bytes: &[u8]) -> Result<(), BatchError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))?;
        fs::write(self.artifact_path(name), bytes)
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))
    }

    async fn read_if_exists(&self, name: &str) -> Result<Option<Vec<u8>>, BatchError> {
        match fs::read(self.artifact_path(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BatchError::Storage(e.to_string())),
        }
    }

    async fn delete_if_exists(&self, name: &str) -> Result<(), BatchError> {
        match fs::remove_file(self.artifact_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BatchError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn artifacts_survive_a_new_store_instance() {
        let dir = tempdir().unwrap();

        let store = FileArtifactStore::new(dir.path());
        store
            .create_or_overwrite("state.json", b"{\"version\":1}")
            .await
            .unwrap();

        // A later invocation opens its own store over the same directory.
        let reopened = FileArtifactStore::new(dir.path());
        assert_eq!(
            reopened.read_if_exists("state.json").await.unwrap(),
            Some(b"{\"version\":1}".to_vec())
        );
    }

    #[tokio::test]
    async fn missing_artifacts_read_as_absent_and_delete_quietly() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        assert!(store.read_if_exists("nope.json").await.unwrap().is_none());
        store.delete_if_exists("nope.json").await.unwrap();
    }

    #[tokio::test]
    async fn overwrite_replaces_content() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        store.create_or_overwrite("a", b"first").await.unwrap();
        store.create_or_overwrite("a", b"second").await.unwrap();

        assert_eq!(
            store.read_if_exists("a").await.unwrap(),
            Some(b"second".to_vec())
        );
    }
}
