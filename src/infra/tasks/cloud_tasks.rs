// One-shot re-invocation through a Cloud Tasks queue.
//
// A suspended batch enqueues a task whose scheduleTime lies a short delay in
// the future; the queue then POSTs the entry point name back at the deployed
// updater. Cancelling drains the whole queue, which is safe because the queue
// is dedicated to this batch.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::core::batch::{BatchError, RunScheduler};
use crate::infra::google::service_account::ServiceAccountAuth;

/// Where follow-up tasks are queued and what they call back into.
#[derive(Debug, Clone)]
pub struct TasksConfig {
    pub project: String,
    pub location: String,
    pub queue: String,
    /// URL of the deployed updater that receives the follow-up POST.
    pub target_url: String,
}

impl TasksConfig {
    fn queue_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/queues/{}",
            self.project, self.location, self.queue
        )
    }
}

/// Body of the follow-up POST, naming the entry point to resume.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FollowUpPayload<'a> {
    entry_point: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiTask {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiTaskList {
    #[serde(default)]
    tasks: Vec<ApiTask>,
}

pub struct CloudTasksScheduler {
    client: Client,
    auth: Arc<ServiceAccountAuth>,
    config: TasksConfig,
    base_url: String,
}

impl CloudTasksScheduler {
    pub fn new(auth: Arc<ServiceAccountAuth>, config: TasksConfig) -> Self {
        Self {
            client: Client::new(),
            auth,
            config,
            base_url: "https://cloudtasks.googleapis.com/v2".to_string(),
        }
    }

    async fn bearer(&self) -> Result<String, BatchError> {
        self.auth
            .get_access_token()
            .await
            .map(|token| format!("Bearer {}", token))
            .map_err(|e| BatchError::Scheduler(e.to_string()))
    }
}

#[async_trait]
impl RunScheduler for CloudTasksScheduler {
    async fn schedule_once(&self, entry_point: &str, delay: Duration) -> Result<String, BatchError> {
        let bearer = self.bearer().await?;

        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| BatchError::Scheduler(e.to_string()))?;
        let schedule_time = (Utc::now() + delay).to_rfc3339_opts(SecondsFormat::Secs, true);

        let payload = serde_json::to_vec(&FollowUpPayload { entry_point })
            .map_err(|e| BatchError::Scheduler(e.to_string()))?;

        let resp = self
            .client
            .post(format!(
                "{}/{}/tasks",
                self.base_url,
                self.config.queue_path()
            ))
            .header("Authorization", &bearer)
            .json(&serde_json::json!({
                "task": {
                    "scheduleTime": schedule_time,
                    "httpRequest": {
                        "url": self.config.target_url,
                        "httpMethod": "POST",
                        "headers": { "Content-Type": "application/json" },
                        // Cloud Tasks carries HTTP bodies base64-encoded.
                        "body": BASE64.encode(&payload),
                    }
                }
            }))
            .send()
            .await
            .map_err(|e| BatchError::Scheduler(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BatchError::Scheduler(format!(
                "Cloud Tasks returned {} while scheduling '{}'",
                resp.status(),
                entry_point
            )));
        }

        let task: ApiTask = resp
            .json()
            .await
            .map_err(|e| BatchError::Scheduler(e.to_string()))?;
        Ok(task.name)
    }

    async fn cancel_all(&self) -> Result<(), BatchError> {
        let bearer = self.bearer().await?;

        let resp = self
            .client
            .get(format!(
                "{}/{}/tasks",
                self.base_url,
                self.config.queue_path()
            ))
            .header("Authorization", &bearer)
            .send()
            .await
            .map_err(|e| BatchError::Scheduler(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BatchError::Scheduler(format!(
                "Cloud Tasks returned {} while listing registrations",
                resp.status()
            )));
        }

        let listing: ApiTaskList = resp
            .json()
            .await
            .map_err(|e| BatchError::Scheduler(e.to_string()))?;

        for task in listing.tasks {
            tracing::info!("Deleting scheduled run {}", task.name);
            let resp = self
                .client
                .delete(format!("{}/{}", self.base_url, task.name))
                .header("Authorization", &bearer)
                .send()
                .await
                .map_err(|e| BatchError::Scheduler(e.to_string()))?;

            // A task that fired or was deleted between list and delete is fine.
            if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
                return Err(BatchError::Scheduler(format!(
                    "Cloud Tasks returned {} while deleting {}",
                    resp.status(),
                    task.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_path_is_fully_qualified() {
        let config = TasksConfig {
            project: "acme-reports".to_string(),
            location: "europe-west1".to_string(),
            queue: "updater-followups".to_string(),
            target_url: "https://updater.example.com/run".to_string(),
        };

        assert_eq!(
            config.queue_path(),
            "projects/acme-reports/locations/europe-west1/queues/updater-followups"
        );
    }

    #[test]
    fn follow_up_payload_round_trips_through_base64() {
        let payload = serde_json::to_vec(&FollowUpPayload {
            entry_point: "content-update",
        })
        .unwrap();

        let decoded = BASE64.decode(BASE64.encode(&payload)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value["entryPoint"], "content-update");
    }
}
