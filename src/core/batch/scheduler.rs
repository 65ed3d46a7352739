use std::time::Duration;

use async_trait::async_trait;

use super::batch_models::BatchError;

/// Deferred re-invocation of a batch entry point.
///
/// `schedule_once` registers a one-shot run of the named entry point after
/// `delay` and returns an opaque handle for logging. Registrations are not
/// replaced implicitly: the processor is responsible for calling `cancel_all`
/// once a batch completes, otherwise stale registrations accumulate.
#[async_trait]
pub trait RunScheduler: Send + Sync {
    async fn schedule_once(&self, entry_point: &str, delay: Duration) -> Result<String, BatchError>;

    /// Remove every outstanding registration owned by this batch. Safe to call
    /// when none exist.
    async fn cancel_all(&self) -> Result<(), BatchError>;
}
