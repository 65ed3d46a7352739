// Linked-content refresh for one document at a time.
// Notice how this module has NO HTTP-specific code: it works against the
// editor traits below, so the dispatch and iteration rules can be tested
// without touching any Google API.

use std::error::Error;

use async_trait::async_trait;
use thiserror::Error as ThisError;

use crate::core::batch::{
    batch_models::{PRESENTATION_MIME, SPREADSHEET_MIME},
    DocumentDescriptor, DocumentKind, DocumentUpdater,
};

/// Errors raised by the document-editing collaborators.
#[derive(Debug, ThisError)]
pub enum RefreshError {
    #[error("Slides API error: {0}")]
    Slides(String),
    #[error("Sheets API error: {0}")]
    Sheets(String),
}

/// One slide of a presentation, reduced to what the refresh pass needs.
#[derive(Debug, Clone)]
pub struct SlideInfo {
    pub object_id: String,
    /// Set when the slide mirrors a slide in another presentation.
    pub linked_source: Option<String>,
    pub charts: Vec<ChartRef>,
}

/// An embedded Sheets chart on a slide.
#[derive(Debug, Clone)]
pub struct ChartRef {
    pub object_id: String,
    /// Absent once the chart has been unlinked from its spreadsheet.
    pub spreadsheet_id: Option<String>,
}

/// The slide-editing operations content refresh needs.
#[async_trait]
pub trait SlidesEditor: Send + Sync {
    async fn list_slides(&self, presentation_id: &str) -> Result<Vec<SlideInfo>, RefreshError>;
    async fn refresh_linked_slide(
        &self,
        presentation_id: &str,
        slide_id: &str,
    ) -> Result<(), RefreshError>;
    async fn refresh_chart(
        &self,
        presentation_id: &str,
        chart_id: &str,
    ) -> Result<(), RefreshError>;
}

/// The spreadsheet-editing operations content refresh needs.
#[async_trait]
pub trait SheetsEditor: Send + Sync {
    async fn list_data_sources(&self, spreadsheet_id: &str) -> Result<Vec<String>, RefreshError>;
    async fn refresh_all_data_sources(&self, spreadsheet_id: &str) -> Result<(), RefreshError>;
}

/// Drive listing filter for the content-update job.
// Only updatable content as of 2024 is Slides and Sheets; there is no linked
// content to refresh in Docs.
pub fn linked_content_query() -> String {
    format!(
        "(mimeType='{}' or mimeType='{}') and trashed=false",
        PRESENTATION_MIME, SPREADSHEET_MIME
    )
}

/// Refreshes the linked content of one document, dispatching on its kind.
/// Holds no state of its own; every call is independent.
pub struct ContentRefresher<P: SlidesEditor, S: SheetsEditor> {
    slides: P,
    sheets: S,
}

impl<P, S> ContentRefresher<P, S>
where
    P: SlidesEditor,
    S: SheetsEditor,
{
    pub fn new(slides: P, sheets: S) -> Self {
        Self { slides, sheets }
    }

    /// One presentation is one unit of failure: the first error aborts the
    /// remaining refreshes for this document only.
    async fn refresh_presentation(&self, presentation_id: &str) -> Result<(), RefreshError> {
        let slides = self.slides.list_slides(presentation_id).await?;

        for slide in &slides {
            if slide.linked_source.is_some() {
                self.slides
                    .refresh_linked_slide(presentation_id, &slide.object_id)
                    .await?;
            }

            for chart in &slide.charts {
                if chart.spreadsheet_id.is_some() {
                    self.slides
                        .refresh_chart(presentation_id, &chart.object_id)
                        .await?;
                }
            }
        }

        Ok(())
    }

    /// Only content to be updated in a spreadsheet are its data sources.
    async fn refresh_spreadsheet(&self, spreadsheet_id: &str) -> Result<(), RefreshError> {
        let sources = self.sheets.list_data_sources(spreadsheet_id).await?;
        if sources.is_empty() {
            tracing::debug!("Spreadsheet {} has no data sources", spreadsheet_id);
            return Ok(());
        }

        self.sheets.refresh_all_data_sources(spreadsheet_id).await
    }
}

#[async_trait]
impl<P, S> DocumentUpdater for ContentRefresher<P, S>
where
    P: SlidesEditor,
    S: SheetsEditor,
{
    async fn update(
        &self,
        document: &DocumentDescriptor,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        match document.kind() {
            DocumentKind::Presentation => {
                self.refresh_presentation(&document.id).await?;
                tracing::info!("Presentation {} updated successfully", document.id);
            }
            DocumentKind::Spreadsheet => {
                self.refresh_spreadsheet(&document.id).await?;
                tracing::info!("Spreadsheet {} updated successfully", document.id);
            }
            DocumentKind::Unrecognized => {
                tracing::warn!(
                    "Unexpected mime type {} for {}, skipping",
                    document.mime_type,
                    document.id
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockSlides {
        slides: Vec<SlideInfo>,
        refreshed_slides: Mutex<Vec<String>>,
        refreshed_charts: Mutex<Vec<String>>,
        fail_listing: bool,
    }

    #[async_trait]
    impl SlidesEditor for MockSlides {
        async fn list_slides(&self, _presentation_id: &str) -> Result<Vec<SlideInfo>, RefreshError> {
            if self.fail_listing {
                return Err(RefreshError::Slides("permission denied".to_string()));
            }
            Ok(self.slides.clone())
        }

        async fn refresh_linked_slide(
            &self,
            _presentation_id: &str,
            slide_id: &str,
        ) -> Result<(), RefreshError> {
            self.refreshed_slides
                .lock()
                .unwrap()
                .push(slide_id.to_string());
            Ok(())
        }

        async fn refresh_chart(
            &self,
            _presentation_id: &str,
            chart_id: &str,
        ) -> Result<(), RefreshError> {
            self.refreshed_charts
                .lock()
                .unwrap()
                .push(chart_id.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockSheets {
        data_sources: Vec<String>,
        refreshed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SheetsEditor for MockSheets {
        async fn list_data_sources(
            &self,
            _spreadsheet_id: &str,
        ) -> Result<Vec<String>, RefreshError> {
            Ok(self.data_sources.clone())
        }

        async fn refresh_all_data_sources(
            &self,
            spreadsheet_id: &str,
        ) -> Result<(), RefreshError> {
            self.refreshed.lock().unwrap().push(spreadsheet_id.to_string());
            Ok(())
        }
    }

    fn slide(id: &str, linked: bool, charts: Vec<ChartRef>) -> SlideInfo {
        SlideInfo {
            object_id: id.to_string(),
            linked_source: linked.then(|| "master-deck".to_string()),
            charts,
        }
    }

    fn chart(id: &str, linked: bool) -> ChartRef {
        ChartRef {
            object_id: id.to_string(),
            spreadsheet_id: linked.then(|| "sheet-1".to_string()),
        }
    }

    #[tokio::test]
    async fn only_linked_slides_and_linked_charts_are_refreshed() {
        let slides = MockSlides {
            slides: vec![
                slide("s1", true, vec![chart("c1", true), chart("c2", false)]),
                slide("s2", false, vec![chart("c3", true)]),
            ],
            ..Default::default()
        };
        let refresher = ContentRefresher::new(slides, MockSheets::default());

        let doc = DocumentDescriptor::new("pres", PRESENTATION_MIME);
        refresher.update(&doc).await.unwrap();

        assert_eq!(
            *refresher.slides.refreshed_slides.lock().unwrap(),
            vec!["s1"]
        );
        assert_eq!(
            *refresher.slides.refreshed_charts.lock().unwrap(),
            vec!["c1", "c3"]
        );
    }

    #[tokio::test]
    async fn spreadsheets_refresh_their_data_sources_as_one_unit() {
        let sheets = MockSheets {
            data_sources: vec!["ds1".to_string(), "ds2".to_string()],
            ..Default::default()
        };
        let refresher = ContentRefresher::new(MockSlides::default(), sheets);

        let doc = DocumentDescriptor::new("sheet", SPREADSHEET_MIME);
        refresher.update(&doc).await.unwrap();

        assert_eq!(*refresher.sheets.refreshed.lock().unwrap(), vec!["sheet"]);
    }

    #[tokio::test]
    async fn spreadsheet_without_data_sources_is_left_alone() {
        let refresher = ContentRefresher::new(MockSlides::default(), MockSheets::default());

        let doc = DocumentDescriptor::new("sheet", SPREADSHEET_MIME);
        refresher.update(&doc).await.unwrap();

        assert!(refresher.sheets.refreshed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unrecognized_kind_is_skipped_without_error() {
        let refresher = ContentRefresher::new(MockSlides::default(), MockSheets::default());

        let doc = DocumentDescriptor::new("doc", "application/vnd.google-apps.document");
        refresher.update(&doc).await.unwrap();

        assert!(refresher.slides.refreshed_slides.lock().unwrap().is_empty());
        assert!(refresher.sheets.refreshed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn editor_errors_propagate_to_the_caller() {
        let slides = MockSlides {
            fail_listing: true,
            ..Default::default()
        };
        let refresher = ContentRefresher::new(slides, MockSheets::default());

        let doc = DocumentDescriptor::new("pres", PRESENTATION_MIME);
        let err = refresher.update(&doc).await.unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn content_query_matches_slides_and_sheets_only() {
        let query = linked_content_query();
        assert_eq!(
            query,
            "(mimeType='application/vnd.google-apps.presentation' \
             or mimeType='application/vnd.google-apps.spreadsheet') and trashed=false"
        );
    }
}
