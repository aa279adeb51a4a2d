//! Latest-request-wins fencing for list views.
//!
//! Each refresh of a list takes a ticket from a monotonic counter. When the response
//! arrives it is applied only if no newer ticket has been issued since, so a slow response
//! can never overwrite a newer one.

use crate::query::Page;
use crate::TraumaResult;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct RequestFence {
    latest: AtomicU64,
}

impl RequestFence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// What a list view shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<T> {
    pub loading: bool,
    pub page: Option<Page<T>>,
    pub error: Option<String>,
}

impl<T> Default for ListSnapshot<T> {
    fn default() -> Self {
        Self {
            loading: false,
            page: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Failed,
    /// A newer refresh was started before this one finished; its result was dropped.
    Stale,
}

pub struct ListState<T> {
    fence: RequestFence,
    snapshot: Mutex<ListSnapshot<T>>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            fence: RequestFence::new(),
            snapshot: Mutex::new(ListSnapshot::default()),
        }
    }
}

impl<T: Clone> ListState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.lock().clone()
    }

    /// Starts a refresh and marks the view as loading.
    pub fn begin(&self) -> Ticket {
        let ticket = self.fence.issue();
        self.lock().loading = true;
        ticket
    }

    /// Applies the result of the refresh identified by `ticket`, unless it is stale.
    ///
    /// A failure clears the previous rows and records the error text.
    pub fn finish(&self, ticket: Ticket, result: TraumaResult<Page<T>>) -> RefreshOutcome {
        let mut snapshot = self.lock();
        if !self.fence.is_current(ticket) {
            tracing::warn!(ticket = ticket.0, "dropping stale list response");
            return RefreshOutcome::Stale;
        }

        snapshot.loading = false;
        match result {
            Ok(page) => {
                snapshot.page = Some(page);
                snapshot.error = None;
                RefreshOutcome::Applied
            }
            Err(e) => {
                snapshot.page = None;
                snapshot.error = Some(e.user_message());
                RefreshOutcome::Failed
            }
        }
    }

    pub async fn refresh<F>(&self, request: F) -> RefreshOutcome
    where
        F: Future<Output = TraumaResult<Page<T>>>,
    {
        let ticket = self.begin();
        let result = request.await;
        self.finish(ticket, result)
    }

    fn lock(&self) -> MutexGuard<'_, ListSnapshot<T>> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Counted, PageRequest};
    use crate::TraumaError;

    fn page(rows: Vec<u32>) -> Page<u32> {
        let total_count = rows.len() as u64;
        Page::from_counted(Counted { rows, total_count }, PageRequest::admissions(1))
    }

    #[test]
    fn tickets_are_monotonic() {
        let fence = RequestFence::new();
        let a = fence.issue();
        let b = fence.issue();
        assert!(b > a);
        assert!(!fence.is_current(a));
        assert!(fence.is_current(b));
    }

    #[test]
    fn stale_response_after_newer_one_is_dropped() {
        let state = ListState::new();
        let older = state.begin();
        let newer = state.begin();

        assert_eq!(state.finish(newer, Ok(page(vec![2]))), RefreshOutcome::Applied);
        assert_eq!(state.finish(older, Ok(page(vec![1]))), RefreshOutcome::Stale);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.page.map(|p| p.rows), Some(vec![2]));
        assert!(!snapshot.loading);
    }

    #[test]
    fn stale_response_before_newer_one_is_also_dropped() {
        let state = ListState::new();
        let older = state.begin();
        let newer = state.begin();

        assert_eq!(state.finish(older, Ok(page(vec![1]))), RefreshOutcome::Stale);
        assert!(state.snapshot().loading);
        assert_eq!(state.finish(newer, Ok(page(vec![2]))), RefreshOutcome::Applied);
    }

    #[tokio::test]
    async fn failure_clears_rows_and_records_message() {
        let state = ListState::new();
        state.refresh(async { Ok(page(vec![1, 2])) }).await;

        let outcome = state
            .refresh(async { Err(TraumaError::store(None, "JWT expired")) })
            .await;
        assert_eq!(outcome, RefreshOutcome::Failed);

        let snapshot = state.snapshot();
        assert!(snapshot.page.is_none());
        assert_eq!(snapshot.error.as_deref(), Some("JWT expired"));
    }
}
