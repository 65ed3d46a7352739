// Master-design propagation.
//
// Presentations carrying the "auto design update" label get the master deck's
// current design by way of a slide copy: appending a slide from the master
// imports its design alongside the stale one, after which the stale master
// and the appended slide are both removed.

use std::error::Error;

use async_trait::async_trait;

use crate::core::batch::{
    batch_models::PRESENTATION_MIME, DocumentDescriptor, DocumentKind, DocumentUpdater,
};

use super::content_refresh::RefreshError;

/// Slide-editing operations the design pass needs.
#[async_trait]
pub trait DesignEditor: Send + Sync {
    async fn first_slide_id(&self, presentation_id: &str) -> Result<String, RefreshError>;
    /// Appends a copy of `source_slide_id` (from `source_presentation_id`) to
    /// the end of `target_id`, returning the new slide's object id.
    async fn append_slide_from(
        &self,
        target_id: &str,
        source_presentation_id: &str,
        source_slide_id: &str,
    ) -> Result<String, RefreshError>;
    async fn list_master_ids(&self, presentation_id: &str) -> Result<Vec<String>, RefreshError>;
    async fn delete_master(
        &self,
        presentation_id: &str,
        master_id: &str,
    ) -> Result<(), RefreshError>;
    async fn delete_slide(&self, presentation_id: &str, slide_id: &str)
        -> Result<(), RefreshError>;
}

/// Which master deck to copy from and which Drive label marks a presentation
/// as opted in. Label ids come from the Drive admin console.
#[derive(Debug, Clone)]
pub struct DesignConfig {
    pub master_presentation_id: String,
    pub label_id: String,
    pub label_field_id: String,
    pub label_true_value_id: String,
}

impl DesignConfig {
    /// Drive listing filter for the design-update job: presentations whose
    /// label field is set to the configured 'true' value.
    pub fn drive_query(&self) -> String {
        format!(
            "mimeType='{}' and trashed=false and labels/{}.{}='{}'",
            PRESENTATION_MIME, self.label_id, self.label_field_id, self.label_true_value_id
        )
    }
}

/// Applies the master deck design to one presentation per call.
pub struct DesignRefresher<E: DesignEditor> {
    editor: E,
    config: DesignConfig,
}

impl<E: DesignEditor> DesignRefresher<E> {
    pub fn new(editor: E, config: DesignConfig) -> Self {
        Self { editor, config }
    }

    async fn apply_master_design(&self, presentation_id: &str) -> Result<(), RefreshError> {
        let template_slide = self
            .editor
            .first_slide_id(&self.config.master_presentation_id)
            .await?;

        // Appending the template slide brings the master deck's design in
        // next to the stale one.
        let appended = self
            .editor
            .append_slide_from(
                presentation_id,
                &self.config.master_presentation_id,
                &template_slide,
            )
            .await?;

        // The stale design is the first master; removing it re-bases every
        // remaining slide onto the imported design.
        let masters = self.editor.list_master_ids(presentation_id).await?;
        if let Some(stale) = masters.first() {
            self.editor.delete_master(presentation_id, stale).await?;
        }

        self.editor.delete_slide(presentation_id, &appended).await?;
        Ok(())
    }
}

#[async_trait]
impl<E: DesignEditor> DocumentUpdater for DesignRefresher<E> {
    async fn update(
        &self,
        document: &DocumentDescriptor,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        match document.kind() {
            DocumentKind::Presentation => {
                self.apply_master_design(&document.id).await?;
                tracing::info!("Presentation {} updated successfully", document.id);
            }
            _ => {
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

    /// Records the edit sequence applied to each presentation.
    struct MockEditor {
        operations: Mutex<Vec<String>>,
        masters: Vec<String>,
        fail_append: bool,
    }

    impl MockEditor {
        fn new(masters: &[&str]) -> Self {
            Self {
                operations: Mutex::new(Vec::new()),
                masters: masters.iter().map(|s| s.to_string()).collect(),
                fail_append: false,
            }
        }

        fn record(&self, op: String) {
            self.operations.lock().unwrap().push(op);
        }
    }

    #[async_trait]
    impl DesignEditor for MockEditor {
        async fn first_slide_id(&self, presentation_id: &str) -> Result<String, RefreshError> {
            self.record(format!("first-slide {}", presentation_id));
            Ok("template-slide".to_string())
        }

        async fn append_slide_from(
            &self,
            target_id: &str,
            source_presentation_id: &str,
            source_slide_id: &str,
        ) -> Result<String, RefreshError> {
            if self.fail_append {
                return Err(RefreshError::Slides("append rejected".to_string()));
            }
            self.record(format!(
                "append {} <- {}/{}",
                target_id, source_presentation_id, source_slide_id
            ));
            Ok("appended-slide".to_string())
        }

        async fn list_master_ids(
            &self,
            _presentation_id: &str,
        ) -> Result<Vec<String>, RefreshError> {
            Ok(self.masters.clone())
        }

        async fn delete_master(
            &self,
            presentation_id: &str,
            master_id: &str,
        ) -> Result<(), RefreshError> {
            self.record(format!("delete-master {} {}", presentation_id, master_id));
            Ok(())
        }

        async fn delete_slide(
            &self,
            presentation_id: &str,
            slide_id: &str,
        ) -> Result<(), RefreshError> {
            self.record(format!("delete-slide {} {}", presentation_id, slide_id));
            Ok(())
        }
    }

    fn config() -> DesignConfig {
        DesignConfig {
            master_presentation_id: "master-deck".to_string(),
            label_id: "ABC1234DEF".to_string(),
            label_field_id: "FED4321CBA".to_string(),
            label_true_value_id: "CAB3421FDE".to_string(),
        }
    }

    #[tokio::test]
    async fn design_update_appends_then_removes_stale_master_and_copy() {
        let refresher = DesignRefresher::new(MockEditor::new(&["old-master", "new-master"]), config());

        let doc = DocumentDescriptor::new("deck-1", PRESENTATION_MIME);
        refresher.update(&doc).await.unwrap();

        let ops = refresher.editor.operations.lock().unwrap().clone();
        assert_eq!(
            ops,
            vec![
                "first-slide master-deck",
                "append deck-1 <- master-deck/template-slide",
                "delete-master deck-1 old-master",
                "delete-slide deck-1 appended-slide",
            ]
        );
    }

    #[tokio::test]
    async fn non_presentation_documents_are_skipped() {
        let refresher = DesignRefresher::new(MockEditor::new(&["m"]), config());

        let doc = DocumentDescriptor::new("sheet", "application/vnd.google-apps.spreadsheet");
        refresher.update(&doc).await.unwrap();

        assert!(refresher.editor.operations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_failure_aborts_this_document_only() {
        let mut editor = MockEditor::new(&["old-master"]);
        editor.fail_append = true;
        let refresher = DesignRefresher::new(editor, config());

        let doc = DocumentDescriptor::new("deck-1", PRESENTATION_MIME);
        let err = refresher.update(&doc).await.unwrap_err();

        assert!(err.to_string().contains("append rejected"));
        // No destructive edit happened after the failed append.
        let ops = refresher.editor.operations.lock().unwrap().clone();
        assert_eq!(ops, vec!["first-slide master-deck"]);
    }

    #[test]
    fn drive_query_filters_on_the_label_value() {
        let query = config().drive_query();
        assert_eq!(
            query,
            "mimeType='application/vnd.google-apps.presentation' and trashed=false \
             and labels/ABC1234DEF.FED4321CBA='CAB3421FDE'"
        );
    }
}
