pub mod batch_models;
pub mod batch_processor;
pub mod elapsed_guard;
pub mod progress_store;
pub mod scheduler;
pub mod work_source;

pub use batch_models::{BatchConfig, BatchError, DocumentDescriptor, DocumentKind};
pub use batch_processor::{BatchOutcome, BatchProcessor, DocumentUpdater};
pub use progress_store::{ArtifactStore, ProgressStore};
pub use scheduler::RunScheduler;
pub use work_source::{DocumentListing, ListPage, WorkSource};
