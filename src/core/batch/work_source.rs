// Produces the work list for one invocation, either by resuming from saved
// progress or by paging through the remote listing from scratch.

use std::sync::Arc;

use async_trait::async_trait;

use super::batch_models::{BatchError, DocumentDescriptor};
use super::progress_store::{ArtifactStore, ProgressStore};

/// One page of a remote listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub files: Vec<DocumentDescriptor>,
    pub next_page_token: Option<String>,
}

/// Remote listing collaborator. The filter string is opaque to the batch
/// layer; callers decide what "matching" means.
#[async_trait]
pub trait DocumentListing: Send + Sync {
    async fn list_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListPage, BatchError>;
}

pub struct WorkSource<L: DocumentListing, A: ArtifactStore> {
    listing: L,
    progress: Arc<ProgressStore<A>>,
    query: String,
    page_size: u32,
}

impl<L, A> WorkSource<L, A>
where
    L: DocumentListing,
    A: ArtifactStore,
{
    pub fn new(
        listing: L,
        progress: Arc<ProgressStore<A>>,
        query: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            listing,
            progress,
            query: query.into(),
            page_size,
        }
    }

    /// Two options:
    /// 1. If saved progress exists, that is the work list - returned verbatim,
    ///    with no re-listing and no merge against newly matching documents.
    /// 2. Otherwise page through the listing from scratch, appending in the
    ///    order received until there is no continuation token.
    pub async fn work_list(&self) -> Result<Vec<DocumentDescriptor>, BatchError> {
        if let Some(remaining) = self.progress.read().await? {
            tracing::info!("Resuming batch, {} files still to be updated", remaining.len());
            return Ok(remaining);
        }

        let mut result = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .listing
                .list_page(&self.query, self.page_size, page_token.as_deref())
                .await?;
            result.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::info!("{} files will be updated", result.len());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::batch_models::{PRESENTATION_MIME, SPREADSHEET_MIME};
    use crate::infra::batch::in_memory::InMemoryArtifactStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves a fixed sequence of pages and records how it was called.
    struct PagedListing {
        pages: Mutex<Vec<ListPage>>,
        calls: AtomicUsize,
    }

    impl PagedListing {
        fn new(pages: Vec<ListPage>) -> Self {
            Self {
                pages: Mutex::new(pages),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentListing for PagedListing {
        async fn list_page(
            &self,
            _query: &str,
            _page_size: u32,
            page_token: Option<&str>,
        ) -> Result<ListPage, BatchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            // First request carries no token, follow-ups echo the one we returned.
            if call == 0 {
                assert!(page_token.is_none());
            } else {
                assert_eq!(page_token, Some(format!("page-{}", call).as_str()));
            }
            let mut pages = self.pages.lock().unwrap();
            Ok(pages.remove(0))
        }
    }

    fn descriptor(id: &str) -> DocumentDescriptor {
        DocumentDescriptor::new(id, PRESENTATION_MIME)
    }

    fn fresh_progress() -> Arc<ProgressStore<InMemoryArtifactStore>> {
        Arc::new(ProgressStore::new(InMemoryArtifactStore::new(), "state.json"))
    }

    #[tokio::test]
    async fn fresh_path_pages_until_no_continuation_token() {
        let listing = PagedListing::new(vec![
            ListPage {
                files: vec![descriptor("a"), descriptor("b")],
                next_page_token: Some("page-1".to_string()),
            },
            ListPage {
                files: vec![descriptor("c")],
                next_page_token: Some("page-2".to_string()),
            },
            ListPage {
                files: vec![descriptor("d")],
                next_page_token: None,
            },
        ]);

        let source = WorkSource::new(listing, fresh_progress(), "q", 500);
        let work = source.work_list().await.unwrap();

        let ids: Vec<&str> = work.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(source.listing.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_first_page_yields_an_empty_work_list() {
        let listing = PagedListing::new(vec![ListPage::default()]);
        let source = WorkSource::new(listing, fresh_progress(), "q", 500);

        let work = source.work_list().await.unwrap();
        assert!(work.is_empty());
    }

    #[tokio::test]
    async fn saved_progress_is_returned_verbatim_without_listing() {
        let progress = fresh_progress();
        let remaining = vec![
            DocumentDescriptor::new("x", SPREADSHEET_MIME),
            DocumentDescriptor::new("y", PRESENTATION_MIME),
        ];
        progress.save(&remaining).await.unwrap();

        // A listing with no pages would panic if it were consulted.
        let listing = PagedListing::new(Vec::new());
        let source = WorkSource::new(listing, progress, "q", 500);

        let work = source.work_list().await.unwrap();
        assert_eq!(work, remaining);
        assert_eq!(source.listing.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn listing_failure_propagates_on_the_fresh_path() {
        struct FailingListing;

        #[async_trait]
        impl DocumentListing for FailingListing {
            async fn list_page(
                &self,
                _query: &str,
                _page_size: u32,
                _page_token: Option<&str>,
            ) -> Result<ListPage, BatchError> {
                Err(BatchError::Listing("backend unavailable".to_string()))
            }
        }

        let source = WorkSource::new(FailingListing, fresh_progress(), "q", 500);
        let err = source.work_list().await.unwrap_err();
        assert!(matches!(err, BatchError::Listing(_)));
    }
}
