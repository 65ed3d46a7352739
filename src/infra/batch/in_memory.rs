use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::batch::{ArtifactStore, BatchError, RunScheduler};

/// Artifact store backed by a shared map. Clones share the same artifacts,
/// which mirrors how two consecutive invocations share one Drive space.
#[derive(Clone, Default)]
pub struct InMemoryArtifactStore {
    artifacts: Arc<DashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn create_or_overwrite(&self, name: &str, bytes: &[u8]) -> Result<(), BatchError> {
        self.artifacts.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read_if_exists(&self, name: &str) -> Result<Option<Vec<u8>>, BatchError> {
        Ok(self.artifacts.get(name).map(|entry| entry.value().clone()))
    }

    async fn delete_if_exists(&self, name: &str) -> Result<(), BatchError> {
        self.artifacts.remove(name);
        Ok(())
    }
}

/// A registration recorded by [`InMemoryScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRun {
    pub entry_point: String,
    pub delay: Duration,
}

/// Scheduler that records registrations instead of firing them.
#[derive(Default)]
pub struct InMemoryScheduler {
    registrations: Mutex<Vec<ScheduledRun>>,
    cancel_calls: AtomicUsize,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled_runs(&self) -> Vec<ScheduledRun> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunScheduler for InMemoryScheduler {
    async fn schedule_once(&self, entry_point: &str, delay: Duration) -> Result<String, BatchError> {
        let mut registrations = self.registrations.lock().unwrap();
        registrations.push(ScheduledRun {
            entry_point: entry_point.to_string(),
            delay,
        });
        Ok(format!("in-memory/{}", registrations.len()))
    }

    async fn cancel_all(&self) -> Result<(), BatchError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.registrations.lock().unwrap().clear();
        Ok(())
    }
}
