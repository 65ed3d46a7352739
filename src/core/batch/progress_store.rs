// Durable progress state for a batch, saved between invocations so a
// suspended run can tell the next one where to continue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::batch_models::{BatchError, DocumentDescriptor};

pub const CHECKPOINT_VERSION: u32 = 1;

/// Storage for a single named artifact. Implementations must give `save`
/// find-or-create-then-overwrite semantics: the same name never yields two
/// artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn create_or_overwrite(&self, name: &str, bytes: &[u8]) -> Result<(), BatchError>;
    async fn read_if_exists(&self, name: &str) -> Result<Option<Vec<u8>>, BatchError>;
    async fn delete_if_exists(&self, name: &str) -> Result<(), BatchError>;
}

/// Serialized snapshot of the remaining work list. The version tag guards
/// against schema drift: an unknown version is a fatal read error rather than
/// something to silently skip, since skipping would either reprocess the whole
/// corpus or drop the remaining suffix.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Checkpoint {
    version: u32,
    saved_at: DateTime<Utc>,
    remaining: Vec<DocumentDescriptor>,
}

/// Persists and retrieves the remaining work list under one fixed artifact
/// name. Serialization problems and storage unavailability are both fatal for
/// the invocation; there is no retry at this layer.
pub struct ProgressStore<A: ArtifactStore> {
    store: A,
    artifact_name: String,
}

impl<A: ArtifactStore> ProgressStore<A> {
    pub fn new(store: A, artifact_name: impl Into<String>) -> Self {
        Self {
            store,
            artifact_name: artifact_name.into(),
        }
    }

    pub async fn save(&self, remaining: &[DocumentDescriptor]) -> Result<(), BatchError> {
        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            remaining: remaining.to_vec(),
        };
        let bytes =
            serde_json::to_vec(&checkpoint).map_err(|e| BatchError::Format(e.to_string()))?;
        self.store
            .create_or_overwrite(&self.artifact_name, &bytes)
            .await
    }

    /// `None` is the normal fresh-batch condition, not an error.
    pub async fn read(&self) -> Result<Option<Vec<DocumentDescriptor>>, BatchError> {
        let bytes = match self.store.read_if_exists(&self.artifact_name).await? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let checkpoint: Checkpoint =
            serde_json::from_slice(&bytes).map_err(|e| BatchError::Format(e.to_string()))?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(BatchError::Format(format!(
                "unsupported checkpoint version {} (expected {})",
                checkpoint.version, CHECKPOINT_VERSION
            )));
        }

        Ok(Some(checkpoint.remaining))
    }

    pub async fn clear(&self) -> Result<(), BatchError> {
        self.store.delete_if_exists(&self.artifact_name).await
    }

    pub fn store(&self) -> &A {
        &self.store
    }
}
