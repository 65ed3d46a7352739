use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::core::refresh::{ChartRef, DesignEditor, RefreshError, SlideInfo, SlidesEditor};
use crate::infra::google::service_account::ServiceAccountAuth;

/// Slides REST client. Reads are a single `presentations.get`; every edit
/// goes through `presentations.batchUpdate` with one request per call, so a
/// failed edit names the exact operation in its error.
#[derive(Clone)]
pub struct SlidesApiClient {
    client: Client,
    auth: Arc<ServiceAccountAuth>,
    base_url: String,
}

// Only the fields the refresh passes look at; everything else in the
// presentation payload is ignored on deserialization.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPresentation {
    #[serde(default)]
    slides: Vec<ApiPage>,
    #[serde(default)]
    masters: Vec<ApiPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPage {
    object_id: String,
    slide_properties: Option<ApiSlideProperties>,
    #[serde(default)]
    page_elements: Vec<ApiPageElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSlideProperties {
    /// Present on slides that mirror a slide in another presentation.
    source_presentation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPageElement {
    object_id: String,
    sheets_chart: Option<ApiSheetsChart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSheetsChart {
    /// Cleared once a chart has been unlinked from its source spreadsheet.
    spreadsheet_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiBatchUpdateResponse {
    #[serde(default)]
    replies: Vec<serde_json::Value>,
}

impl SlidesApiClient {
    pub fn new(auth: Arc<ServiceAccountAuth>) -> Self {
        Self {
            client: Client::new(),
            auth,
            base_url: "https://slides.googleapis.com/v1".to_string(),
        }
    }

    async fn bearer(&self) -> Result<String, RefreshError> {
        self.auth
            .get_access_token()
            .await
            .map(|token| format!("Bearer {}", token))
            .map_err(|e| RefreshError::Slides(e.to_string()))
    }

    async fn get_presentation(&self, presentation_id: &str) -> Result<ApiPresentation, RefreshError> {
        let bearer = self.bearer().await?;

        let resp = self
            .client
            .get(format!("{}/presentations/{}", self.base_url, presentation_id))
            .header("Authorization", &bearer)
            .send()
            .await
            .map_err(|e| RefreshError::Slides(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RefreshError::Slides(format!(
                "Slides returned {} for presentation {}",
                resp.status(),
                presentation_id
            )));
        }

        resp.json()
            .await
            .map_err(|e| RefreshError::Slides(e.to_string()))
    }

    async fn batch_update(
        &self,
        presentation_id: &str,
        request: serde_json::Value,
    ) -> Result<ApiBatchUpdateResponse, RefreshError> {
        let bearer = self.bearer().await?;

        let resp = self
            .client
            .post(format!(
                "{}/presentations/{}:batchUpdate",
                self.base_url, presentation_id
            ))
            .header("Authorization", &bearer)
            .json(&serde_json::json!({ "requests": [request] }))
            .send()
            .await
            .map_err(|e| RefreshError::Slides(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RefreshError::Slides(format!(
                "Slides returned {} while updating presentation {}",
                resp.status(),
                presentation_id
            )));
        }

        resp.json()
            .await
            .map_err(|e| RefreshError::Slides(e.to_string()))
    }
}

#[async_trait]
impl SlidesEditor for SlidesApiClient {
    async fn list_slides(&self, presentation_id: &str) -> Result<Vec<SlideInfo>, RefreshError> {
        let presentation = self.get_presentation(presentation_id).await?;

        let slides = presentation
            .slides
            .into_iter()
            .map(|page| SlideInfo {
                linked_source: page
                    .slide_properties
                    .and_then(|p| p.source_presentation_id),
                charts: page
                    .page_elements
                    .into_iter()
                    .filter_map(|element| {
                        element.sheets_chart.map(|chart| ChartRef {
                            object_id: element.object_id,
                            spreadsheet_id: chart.spreadsheet_id,
                        })
                    })
                    .collect(),
                object_id: page.object_id,
            })
            .collect();

        Ok(slides)
    }

    async fn refresh_linked_slide(
        &self,
        presentation_id: &str,
        slide_id: &str,
    ) -> Result<(), RefreshError> {
        self.batch_update(
            presentation_id,
            serde_json::json!({ "refreshSlide": { "objectId": slide_id } }),
        )
        .await?;
        Ok(())
    }

    async fn refresh_chart(
        &self,
        presentation_id: &str,
        chart_id: &str,
    ) -> Result<(), RefreshError> {
        self.batch_update(
            presentation_id,
            serde_json::json!({ "refreshSheetsChart": { "objectId": chart_id } }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DesignEditor for SlidesApiClient {
    async fn first_slide_id(&self, presentation_id: &str) -> Result<String, RefreshError> {
        let presentation = self.get_presentation(presentation_id).await?;
        presentation
            .slides
            .into_iter()
            .next()
            .map(|page| page.object_id)
            .ok_or_else(|| {
                RefreshError::Slides(format!("presentation {} has no slides", presentation_id))
            })
    }

    async fn append_slide_from(
        &self,
        target_id: &str,
        source_presentation_id: &str,
        source_slide_id: &str,
    ) -> Result<String, RefreshError> {
        let response = self
            .batch_update(
                target_id,
                serde_json::json!({
                    "appendSlide": {
                        "sourcePresentationId": source_presentation_id,
                        "sourceSlideObjectId": source_slide_id,
                    }
                }),
            )
            .await?;

        response
            .replies
            .first()
            .and_then(|reply| reply["appendSlide"]["objectId"].as_str())
            .map(|id| id.to_string())
            .ok_or_else(|| {
                RefreshError::Slides(format!(
                    "appendSlide reply for {} carried no object id",
                    target_id
                ))
            })
    }

    async fn list_master_ids(&self, presentation_id: &str) -> Result<Vec<String>, RefreshError> {
        let presentation = self.get_presentation(presentation_id).await?;
        Ok(presentation
            .masters
            .into_iter()
            .map(|page| page.object_id)
            .collect())
    }

    async fn delete_master(
        &self,
        presentation_id: &str,
        master_id: &str,
    ) -> Result<(), RefreshError> {
        self.batch_update(
            presentation_id,
            serde_json::json!({ "deleteObject": { "objectId": master_id } }),
        )
        .await?;
        Ok(())
    }

    async fn delete_slide(
        &self,
        presentation_id: &str,
        slide_id: &str,
    ) -> Result<(), RefreshError> {
        self.batch_update(
            presentation_id,
            serde_json::json!({ "deleteObject": { "objectId": slide_id } }),
        )
        .await?;
        Ok(())
    }
}
