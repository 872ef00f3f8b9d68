//! Pagination state for the list views: one controller instance per list,
//! owning the current page, page size, and the rows from the last
//! successful fetch.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use shared::protocol::{PagedResponse, PageQuery};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{error::ApiClientError, Session};

const DEFAULT_PAGE_SIZE: u32 = 10;

/// A server-side listing a pager can drive: fetch one page, optionally
/// delete a row. `AdminApi` provides the production sources; tests use
/// in-memory fakes.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Row: Clone + Send + Sync;

    /// Short name used in log fields and error messages.
    fn list_name(&self) -> &'static str;

    async fn fetch_page(
        &self,
        session: &Session,
        query: PageQuery,
    ) -> Result<PagedResponse<Self::Row>, ApiClientError>;

    async fn delete_row(&self, _session: &Session, _id: i64) -> Result<(), ApiClientError> {
        Err(ApiClientError::DeleteUnsupported(self.list_name()))
    }
}

/// Snapshot of a pager's state. `items` always reflects the last successful
/// fetch for (`page`, `per_page`); a failed fetch only ever sets
/// `last_error`.
#[derive(Debug, Clone)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u32,
    pub last_error: Option<String>,
}

impl<T> Default for ListPage<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            last_page: 1,
            last_error: None,
        }
    }
}

/// Owns pagination state for one list view. All mutation goes through
/// `set_page`, `set_page_size`, `delete`, and `refresh`; state is committed
/// only from responses that are still the latest issued fetch, so a slow
/// superseded response can never overwrite a newer page.
pub struct PagedListController<S: PageSource> {
    source: S,
    session: Session,
    seq: AtomicU64,
    inner: Mutex<ListPage<S::Row>>,
}

impl<S: PageSource> PagedListController<S> {
    pub fn new(source: S, session: Session) -> Self {
        Self {
            source,
            session,
            seq: AtomicU64::new(0),
            inner: Mutex::new(ListPage::default()),
        }
    }

    pub async fn snapshot(&self) -> ListPage<S::Row> {
        self.inner.lock().await.clone()
    }

    /// Re-issues the fetch for the current (page, page size) pair.
    pub async fn refresh(&self) -> ListPage<S::Row> {
        let (page, per_page) = {
            let state = self.inner.lock().await;
            (state.page, state.per_page)
        };
        self.fetch_and_commit(page, per_page).await;
        self.snapshot().await
    }

    /// Navigates to page `n` (1-based; values below 1 are clamped). Whether
    /// `n` is past the end is the server's call, not ours.
    pub async fn set_page(&self, n: u32) -> ListPage<S::Row> {
        let page = n.max(1);
        let per_page = self.inner.lock().await.per_page;
        self.fetch_and_commit(page, per_page).await;
        self.snapshot().await
    }

    /// Changes the page size and jumps back to page 1: the old page index
    /// is meaningless under a new size.
    pub async fn set_page_size(&self, n: u32) -> ListPage<S::Row> {
        let per_page = n.max(1);
        self.fetch_and_commit(1, per_page).await;
        self.snapshot().await
    }

    /// Deletes one row, then refetches the current page. Deletion shifts
    /// later rows forward and only the server knows the new page count, so
    /// a refetch beats pruning the local cache.
    pub async fn delete(&self, id: i64) -> ListPage<S::Row> {
        match self.source.delete_row(&self.session, id).await {
            Ok(()) => {
                debug!(list = self.source.list_name(), id, "row deleted, refetching page");
                self.refresh().await
            }
            Err(err) => {
                warn!(list = self.source.list_name(), id, error = %err, "delete failed");
                let mut state = self.inner.lock().await;
                state.last_error = Some(err.to_string());
                state.clone()
            }
        }
    }

    async fn fetch_and_commit(&self, page: u32, per_page: u32) {
        let ticket = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self
            .source
            .fetch_page(&self.session, PageQuery { page, per_page })
            .await;

        let mut state = self.inner.lock().await;
        if self.seq.load(Ordering::SeqCst) != ticket {
            debug!(
                list = self.source.list_name(),
                page, ticket, "discarding superseded page fetch"
            );
            return;
        }

        match result {
            Ok(response) => {
                debug!(
                    list = self.source.list_name(),
                    page,
                    per_page,
                    rows = response.data.len(),
                    last_page = response.last_page,
                    "page fetched"
                );
                state.items = response.data;
                state.page = page;
                state.per_page = per_page;
                state.last_page = response.last_page.max(1);
                state.last_error = None;
            }
            Err(err) => {
                // Stale-but-available beats blank-on-error: prior items,
                // page, and total stay exactly as they were.
                warn!(list = self.source.list_name(), page, error = %err, "page fetch failed");
                state.last_error = Some(err.to_string());
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/pager_tests.rs"]
mod tests;
