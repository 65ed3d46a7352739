use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::core::batch::{ArtifactStore, BatchError, DocumentDescriptor, DocumentListing, ListPage};
use crate::infra::google::service_account::ServiceAccountAuth;

/// Minimal Drive REST client. It deliberately exposes only the two roles the
/// batch layer needs: paging a listing query and keeping one named JSON
/// artifact (the checkpoint) in the service account's Drive space.
#[derive(Clone)]
pub struct DriveApiClient {
    client: Client,
    auth: Arc<ServiceAccountAuth>,
    base_url: String,
    upload_base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    id: String,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFileList {
    #[serde(default)]
    files: Vec<ApiFile>,
    next_page_token: Option<String>,
}

impl DriveApiClient {
    pub fn new(auth: Arc<ServiceAccountAuth>) -> Self {
        Self {
            client: Client::new(),
            auth,
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }

    async fn bearer(&self) -> Result<String, String> {
        self.auth
            .get_access_token()
            .await
            .map(|token| format!("Bearer {}", token))
            .map_err(|e| e.to_string())
    }

    /// Finds the id of a non-trashed file with the given name, if any.
    async fn find_file_id(&self, name: &str) -> Result<Option<String>, BatchError> {
        let bearer = self.bearer().await.map_err(BatchError::Storage)?;
        let query = format!("name='{}' and trashed=false", name.replace('\'', "\\'"));

        let resp = self
            .client
            .get(format!("{}/files", self.base_url))
            .header("Authorization", &bearer)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id)"),
            ])
            .send()
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BatchError::Storage(format!(
                "Drive returned {} while looking up '{}'",
                resp.status(),
                name
            )));
        }

        let listing: ApiFileList = resp
            .json()
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))?;
        Ok(listing.files.into_iter().next().map(|f| f.id))
    }

    /// Creates an empty JSON file with the given name and returns its id.
    async fn create_empty_file(&self, name: &str) -> Result<String, BatchError> {
        let bearer = self.bearer().await.map_err(BatchError::Storage)?;

        let resp = self
            .client
            .post(format!("{}/files", self.base_url))
            .header("Authorization", &bearer)
            .json(&serde_json::json!({
                "name": name,
                "mimeType": "application/json",
            }))
            .send()
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BatchError::Storage(format!(
                "Drive returned {} while creating '{}'",
                resp.status(),
                name
            )));
        }

        let file: ApiFile = resp
            .json()
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))?;
        Ok(file.id)
    }

    async fn upload_content(&self, file_id: &str, bytes: &[u8]) -> Result<(), BatchError> {
        let bearer = self.bearer().await.map_err(BatchError::Storage)?;

        let resp = self
            .client
            .patch(format!("{}/files/{}", self.upload_base_url, file_id))
            .header("Authorization", &bearer)
            .header("Content-Type", "application/json")
            .query(&[("uploadType", "media")])
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BatchError::Storage(format!(
                "Drive returned {} while uploading content for {}",
                resp.status(),
                file_id
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentListing for DriveApiClient {
    async fn list_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListPage, BatchError> {
        let bearer = self.bearer().await.map_err(BatchError::Listing)?;
        let page_size = page_size.to_string();

        let mut params = vec![
            ("q", query),
            ("pageSize", page_size.as_str()),
            ("corpora", "allDrives"),
            ("includeItemsFromAllDrives", "true"),
            ("supportsAllDrives", "true"),
            ("fields", "nextPageToken,files(id,mimeType)"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let resp = self
            .client
            .get(format!("{}/files", self.base_url))
            .header("Authorization", &bearer)
            .query(&params)
            .send()
            .await
            .map_err(|e| BatchError::Listing(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BatchError::Listing(format!(
                "Drive returned {} for file listing",
                resp.status()
            )));
        }

        let listing: ApiFileList = resp
            .json()
            .await
            .map_err(|e| BatchError::Listing(e.to_string()))?;

        let files = listing
            .files
            .into_iter()
            .map(|f| DocumentDescriptor::new(f.id, f.mime_type.unwrap_or_default()))
            .collect();

        Ok(ListPage {
            files,
            next_page_token: listing.next_page_token,
        })
    }
}

#[async_trait]
impl ArtifactStore for DriveApiClient {
    async fn create_or_overwrite(&self, name: &str, bytes: &[u8]) -> Result<(), BatchError> {
        // Find-or-create keeps a single artifact per name; the media upload
        // then replaces whatever content the file had.
        let file_id = match self.find_file_id(name).await? {
            Some(id) => id,
            None => self.create_empty_file(name).await?,
        };

        self.upload_content(&file_id, bytes).await
    }

    async fn read_if_exists(&self, name: &str) -> Result<Option<Vec<u8>>, BatchError> {
        let file_id = match self.find_file_id(name).await? {
            Some(id) => id,
            None => return Ok(None),
        };

        let bearer = self.bearer().await.map_err(BatchError::Storage)?;
        let resp = self
            .client
            .get(format!("{}/files/{}", self.base_url, file_id))
            .header("Authorization", &bearer)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BatchError::Storage(format!(
                "Drive returned {} while reading '{}'",
                resp.status(),
                name
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn delete_if_exists(&self, name: &str) -> Result<(), BatchError> {
        let file_id = match self.find_file_id(name).await? {
            Some(id) => id,
            None => return Ok(()),
        };

        let bearer = self.bearer().await.map_err(BatchError::Storage)?;
        let resp = self
            .client
            .patch(format!("{}/files/{}", self.base_url, file_id))
            .header("Authorization", &bearer)
            .json(&serde_json::json!({ "trashed": true }))
            .send()
            .await
            .map_err(|e| BatchError::Storage(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BatchError::Storage(format!(
                "Drive returned {} while trashing '{}'",
                resp.status(),
                name
            )));
        }

        Ok(())
    }
}
