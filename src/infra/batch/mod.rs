// Batch infra layer.
#![allow(dead_code)]
// - `in_memory.rs` keeps artifacts and registrations in process memory.
// - `file_store.rs` keeps artifacts on the local filesystem.
// Both stand in for the Drive/Cloud Tasks backends in tests and local runs.

#[path = "in_memory.rs"]
pub mod in_memory;

#[path = "file_store.rs"]
pub mod file_store;

pub use file_store::FileArtifactStore;
pub use in_memory::{InMemoryArtifactStore, InMemoryScheduler};
