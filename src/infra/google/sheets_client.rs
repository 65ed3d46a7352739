use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::core::refresh::{RefreshError, SheetsEditor};
use crate::infra::google::service_account::ServiceAccountAuth;

/// Sheets REST client for data-source refreshes.
#[derive(Clone)]
pub struct SheetsApiClient {
    client: Client,
    auth: Arc<ServiceAccountAuth>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSpreadsheet {
    #[serde(default)]
    data_sources: Vec<ApiDataSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDataSource {
    data_source_id: Option<String>,
}

impl SheetsApiClient {
    pub fn new(auth: Arc<ServiceAccountAuth>) -> Self {
        Self {
            client: Client::new(),
            auth,
            base_url: "https://sheets.googleapis.com/v4".to_string(),
        }
    }

    async fn bearer(&self) -> Result<String, RefreshError> {
        self.auth
            .get_access_token()
            .await
            .map(|token| format!("Bearer {}", token))
            .map_err(|e| RefreshError::Sheets(e.to_string()))
    }
}

#[async_trait]
impl SheetsEditor for SheetsApiClient {
    async fn list_data_sources(&self, spreadsheet_id: &str) -> Result<Vec<String>, RefreshError> {
        let bearer = self.bearer().await?;

        let resp = self
            .client
            .get(format!("{}/spreadsheets/{}", self.base_url, spreadsheet_id))
            .header("Authorization", &bearer)
            .query(&[("fields", "dataSources.dataSourceId")])
            .send()
            .await
            .map_err(|e| RefreshError::Sheets(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RefreshError::Sheets(format!(
                "Sheets returned {} for spreadsheet {}",
                resp.status(),
                spreadsheet_id
            )));
        }

        let spreadsheet: ApiSpreadsheet = resp
            .json()
            .await
            .map_err(|e| RefreshError::Sheets(e.to_string()))?;

        Ok(spreadsheet
            .data_sources
            .into_iter()
            .filter_map(|source| source.data_source_id)
            .collect())
    }

    /// One batchUpdate refreshes every data source in the file, matching the
    /// all-or-nothing failure unit of the content pass.
    async fn refresh_all_data_sources(&self, spreadsheet_id: &str) -> Result<(), RefreshError> {
        let bearer = self.bearer().await?;

        let resp = self
            .client
            .post(format!(
                "{}/spreadsheets/{}:batchUpdate",
                self.base_url, spreadsheet_id
            ))
            .header("Authorization", &bearer)
            .json(&serde_json::json!({
                "requests": [
                    { "refreshDataSource": { "isAll": true, "force": true } }
                ]
            }))
            .send()
            .await
            .map_err(|e| RefreshError::Sheets(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RefreshError::Sheets(format!(
                "Sheets returned {} while refreshing data sources of {}",
                resp.status(),
                spreadsheet_id
            )));
        }

        Ok(())
    }
}
