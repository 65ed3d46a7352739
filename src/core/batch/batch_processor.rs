// The orchestrating loop of a batch job.
//
// One invocation runs to completion: pull the work list, walk it in order,
// and before each document check the elapsed-time guard. When the guard
// trips, the unprocessed suffix is saved and a follow-up run is registered;
// when the list is exhausted, all saved progress and registrations are
// removed. A failing document is logged and skipped, never escalated.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;

use super::batch_models::{BatchConfig, BatchError, DocumentDescriptor};
use super::elapsed_guard::ElapsedGuard;
use super::progress_store::{ArtifactStore, ProgressStore};
use super::scheduler::RunScheduler;
use super::work_source::{DocumentListing, WorkSource};

/// Applies one refresh to one document. Implementations dispatch on the
/// document kind and are expected to tolerate being called again for the same
/// document on a later run.
#[async_trait]
pub trait DocumentUpdater: Send + Sync {
    async fn update(
        &self,
        document: &DocumentDescriptor,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Terminal state of one invocation. `Suspended` is expected behavior, not a
/// failure - the batch continues when the scheduled follow-up run fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed { processed: usize },
    Suspended { processed: usize, remaining: usize },
}

pub struct BatchProcessor<L, A, S, U>
where
    L: DocumentListing,
    A: ArtifactStore,
    S: RunScheduler,
    U: DocumentUpdater,
{
    work_source: WorkSource<L, A>,
    progress: Arc<ProgressStore<A>>,
    scheduler: S,
    updater: U,
    config: BatchConfig,
}

impl<L, A, S, U> BatchProcessor<L, A, S, U>
where
    L: DocumentListing,
    A: ArtifactStore,
    S: RunScheduler,
    U: DocumentUpdater,
{
    pub fn new(
        work_source: WorkSource<L, A>,
        progress: Arc<ProgressStore<A>>,
        scheduler: S,
        updater: U,
        config: BatchConfig,
    ) -> Self {
        Self {
            work_source,
            progress,
            scheduler,
            updater,
            config,
        }
    }

    pub async fn run(&self) -> Result<BatchOutcome, BatchError> {
        let guard = ElapsedGuard::start(self.config.time_budget);
        let work = self.work_source.work_list().await?;

        for (index, document) in work.iter().enumerate() {
            // The guard is only checked at item boundaries; an in-flight
            // update always runs to completion first.
            if guard.is_over_budget() {
                return self.suspend(&work, index).await;
            }

            if let Err(err) = self.updater.update(document).await {
                tracing::error!("Document {} could not be updated: {}", document.id, err);
            }
        }

        // Completed without interruption: drop saved progress and any
        // registrations left over from earlier suspended runs.
        self.progress.clear().await?;
        self.scheduler.cancel_all().await?;

        Ok(BatchOutcome::Completed {
            processed: work.len(),
        })
    }

    async fn suspend(
        &self,
        work: &[DocumentDescriptor],
        index: usize,
    ) -> Result<BatchOutcome, BatchError> {
        let remaining = &work[index..];
        tracing::warn!(
            "Did not finish in time, updated {} files. Saving progress and scheduling follow-up run...",
            index
        );

        // Save before scheduling: a registration without saved state would
        // restart from scratch, while saved state without a registration
        // merely stalls until the next external invocation.
        self.progress.save(remaining).await?;
        let handle = self
            .scheduler
            .schedule_once(&self.config.entry_point, self.config.resume_delay)
            .await?;
        tracing::info!("Follow-up run registered as {}", handle);

        Ok(BatchOutcome::Suspended {
            processed: index,
            remaining: remaining.len(),
        })
    }
}
