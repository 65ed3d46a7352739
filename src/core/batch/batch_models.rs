// Domain models for the checkpointed batch mechanism.
// Nothing in here knows about Drive, Slides or Sheets - the batch layer only
// deals in opaque document identifiers and mime type tags.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const PRESENTATION_MIME: &str = "application/vnd.google-apps.presentation";
pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Errors raised by the batch mechanism itself. Per-document update failures
/// are not represented here - those are logged and swallowed by the processor.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Listing error: {0}")]
    Listing(String),
    #[error("Checkpoint storage error: {0}")]
    Storage(String),
    #[error("Checkpoint format error: {0}")]
    Format(String),
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

/// One remote document awaiting processing: an opaque id plus the mime type
/// reported by the listing. This is also the exact record shape persisted in
/// a checkpoint, so the field names are part of the stored format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub id: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl DocumentDescriptor {
    pub fn new(id: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Tagged view of the mime type so updaters can dispatch without string
    /// comparisons scattered through the loop.
    pub fn kind(&self) -> DocumentKind {
        match self.mime_type.as_str() {
            PRESENTATION_MIME => DocumentKind::Presentation,
            SPREADSHEET_MIME => DocumentKind::Spreadsheet,
            _ => DocumentKind::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Presentation,
    Spreadsheet,
    Unrecognized,
}

/// Configuration for one batch job, assembled at startup and passed in at
/// construction time.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Name under which follow-up runs are registered, e.g. "content-update".
    pub entry_point: String,
    /// Opaque listing filter; the batch layer never inspects it.
    pub query: String,
    /// Listing page size.
    pub page_size: u32,
    /// Wall-clock budget for one invocation. The hosting environment kills the
    /// process at 30 minutes; saving progress and registering the follow-up
    /// run takes up to ~5 minutes, so the default leaves that headroom.
    pub time_budget: Duration,
    /// How long after suspension the follow-up run fires. Must outlast the
    /// checkpoint write, and is independent of `time_budget`.
    pub resume_delay: Duration,
}

impl BatchConfig {
    pub fn new(entry_point: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            query: query.into(),
            page_size: 500,
            time_budget: Duration::from_secs(20 * 60),
            resume_delay: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_derived_from_mime_type() {
        let pres = DocumentDescriptor::new("p1", PRESENTATION_MIME);
        let sheet = DocumentDescriptor::new("s1", SPREADSHEET_MIME);
        let doc = DocumentDescriptor::new("d1", "application/vnd.google-apps.document");

        assert_eq!(pres.kind(), DocumentKind::Presentation);
        assert_eq!(sheet.kind(), DocumentKind::Spreadsheet);
        assert_eq!(doc.kind(), DocumentKind::Unrecognized);
    }

    #[test]
    fn descriptor_serializes_with_wire_field_names() {
        let descriptor = DocumentDescriptor::new("abc123", PRESENTATION_MIME);
        let json = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(json["id"], "abc123");
        assert_eq!(json["mimeType"], PRESENTATION_MIME);
    }

    #[test]
    fn batch_config_defaults_leave_cleanup_headroom() {
        let config = BatchConfig::new("content-update", "trashed=false");

        assert_eq!(config.page_size, 500);
        assert_eq!(config.time_budget, Duration::from_secs(1200));
        assert_eq!(config.resume_delay, Duration::from_secs(60));
        assert!(config.resume_delay < config.time_budget);
    }
}
