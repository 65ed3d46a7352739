// This is the entry point of the workspace updater.
//
// **Architecture Overview:**
// - `core/` = Business logic (batch mechanism, refresh rules)
// - `infra/` = Implementations of core traits (Google APIs, Cloud Tasks)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the requested batch job once and exit
//
// There is no command-line surface: the job is selected through the
// WORKSPACE_JOB environment variable, and each process run is exactly one
// batch invocation. Follow-up invocations after a suspension arrive from the
// Cloud Tasks queue, not from within this process.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pair of mod.rs files that look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;
use std::time::Duration;

use crate::core::batch::{BatchConfig, BatchOutcome, BatchProcessor, ProgressStore, WorkSource};
use crate::core::refresh::{
    linked_content_query, ContentRefresher, DesignConfig, DesignRefresher,
};
use crate::infra::google::{
    DriveApiClient, ServiceAccountAuth, SheetsApiClient, SlidesApiClient, WORKSPACE_SCOPES,
};
use crate::infra::tasks::{CloudTasksScheduler, TasksConfig};

const CONTENT_ENTRY_POINT: &str = "content-update";
const DESIGN_ENTRY_POINT: &str = "design-update";

const CONTENT_CHECKPOINT: &str = "content-updater-state.json";
const DESIGN_CHECKPOINT: &str = "design-updater-state.json";

fn required_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("Missing {} environment variable", name))
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Batch settings shared by both jobs, with optional env overrides for the
/// timing knobs (handy when testing against a small corpus).
fn batch_config(entry_point: &str, query: String) -> BatchConfig {
    let mut config = BatchConfig::new(entry_point, query);
    if let Some(budget) = env_secs("WORKSPACE_TIME_BUDGET_SECS") {
        config.time_budget = budget;
    }
    if let Some(delay) = env_secs("WORKSPACE_RESUME_DELAY_SECS") {
        config.resume_delay = delay;
    }
    if let Some(size) = std::env::var("WORKSPACE_PAGE_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.page_size = size;
    }
    config
}

fn tasks_config() -> anyhow::Result<TasksConfig> {
    Ok(TasksConfig {
        project: required_env("TASKS_PROJECT")?,
        location: required_env("TASKS_LOCATION")?,
        queue: required_env("TASKS_QUEUE")?,
        target_url: required_env("TASKS_TARGET_URL")?,
    })
}

fn design_config() -> anyhow::Result<DesignConfig> {
    Ok(DesignConfig {
        master_presentation_id: required_env("MASTER_PRESENTATION_ID")?,
        label_id: required_env("DESIGN_LABEL_ID")?,
        label_field_id: required_env("DESIGN_LABEL_FIELD_ID")?,
        label_true_value_id: required_env("DESIGN_LABEL_TRUE_VALUE_ID")?,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let job = std::env::var("WORKSPACE_JOB").unwrap_or_else(|_| CONTENT_ENTRY_POINT.to_string());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let auth = Arc::new(ServiceAccountAuth::from_env(WORKSPACE_SCOPES).await?);

    // Drive fills two roles: the listing backend and the checkpoint storage.
    let drive = DriveApiClient::new(Arc::clone(&auth));
    let scheduler = CloudTasksScheduler::new(Arc::clone(&auth), tasks_config()?);

    tracing::info!("Starting {} batch", job);

    let outcome = match job.as_str() {
        CONTENT_ENTRY_POINT => {
            let config = batch_config(CONTENT_ENTRY_POINT, linked_content_query());
            let progress = Arc::new(ProgressStore::new(drive.clone(), CONTENT_CHECKPOINT));
            let work_source = WorkSource::new(
                drive,
                Arc::clone(&progress),
                config.query.clone(),
                config.page_size,
            );
            let updater = ContentRefresher::new(
                SlidesApiClient::new(Arc::clone(&auth)),
                SheetsApiClient::new(Arc::clone(&auth)),
            );

            BatchProcessor::new(work_source, progress, scheduler, updater, config)
                .run()
                .await?
        }
        DESIGN_ENTRY_POINT => {
            let design = design_config()?;
            let config = batch_config(DESIGN_ENTRY_POINT, design.drive_query());
            let progress = Arc::new(ProgressStore::new(drive.clone(), DESIGN_CHECKPOINT));
            let work_source = WorkSource::new(
                drive,
                Arc::clone(&progress),
                config.query.clone(),
                config.page_size,
            );
            let updater = DesignRefresher::new(SlidesApiClient::new(Arc::clone(&auth)), design);

            BatchProcessor::new(work_source, progress, scheduler, updater, config)
                .run()
                .await?
        }
        other => anyhow::bail!(
            "Unknown WORKSPACE_JOB '{}' (expected '{}' or '{}')",
            other,
            CONTENT_ENTRY_POINT,
            DESIGN_ENTRY_POINT
        ),
    };

    match outcome {
        BatchOutcome::Completed { processed } => {
            tracing::info!("Batch completed, {} files processed", processed);
        }
        BatchOutcome::Suspended {
            processed,
            remaining,
        } => {
            tracing::info!(
                "Batch suspended after {} files, {} remaining for the follow-up run",
                processed,
                remaining
            );
        }
    }

    Ok(())
}
