//! Collection fetch engine.
//!
//! Every remote call goes through three steps so that a screen can keep
//! reacting to input while requests are in flight:
//!
//! 1. [`CollectionController::begin_fetch`] stamps a new generation and
//!    snapshots the query into a [`FetchTicket`].
//! 2. [`execute_fetch`] performs the I/O. It only needs the source, never the
//!    controller, so it can run on a spawned task.
//! 3. [`CollectionController::complete`] merges the result, but only if the
//!    ticket is still the latest one issued.
//!
//! [`CollectionController::run`] chains the three for callers that simply
//! await the load.

use std::collections::BTreeSet;
use std::sync::Arc;

use rolodex_provider::{PageQuery, PageResponse, RowId, SortDirection};

use super::bulk_delete::{DeleteConfirmation, prepare_delete};
use super::source::CollectionSource;
use super::state::CollectionViewState;
use crate::error::{CoreError, CoreResult};
use crate::pagination::{ReconcileAction, page_count, reconcile};

/// Consecutive out-of-range answers tolerated before a page is taken as is.
const MAX_REFETCHES: u8 = 3;

/// One issued fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    query: PageQuery,
    delete_ids: Vec<RowId>,
    refetches: u8,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &PageQuery {
        &self.query
    }

    /// Ids deleted by this request; empty for a plain page load.
    pub fn delete_ids(&self) -> &[RowId] {
        &self.delete_ids
    }

    pub fn is_delete(&self) -> bool {
        !self.delete_ids.is_empty()
    }
}

/// A finished request waiting to be merged.
#[derive(Debug)]
pub struct CompletedFetch<R> {
    pub ticket: FetchTicket,
    pub result: CoreResult<PageResponse<R>>,
}

/// Result of merging a [`CompletedFetch`].
#[derive(Debug)]
pub enum FetchOutcome {
    /// Rows replaced.
    Applied,
    /// The requested page no longer exists; this follow-up must be executed.
    Refetch(FetchTicket),
    /// The request failed. Rows were kept.
    Failed(CoreError),
    /// A newer fetch was issued; the result was discarded.
    Stale,
}

/// Perform the request described by `ticket`.
///
/// `DELETE <endpoint>/<ids>` when the ticket carries ids, otherwise `GET`.
pub async fn execute_fetch<S>(source: &S, ticket: FetchTicket) -> CompletedFetch<S::Row>
where
    S: CollectionSource + ?Sized,
{
    let result = if ticket.delete_ids.is_empty() {
        source.fetch_page(&ticket.query).await
    } else {
        source.delete_by_ids(&ticket.delete_ids, &ticket.query).await
    };
    CompletedFetch { ticket, result }
}

/// State machine behind one list screen.
pub struct CollectionController<S: CollectionSource> {
    source: Arc<S>,
    plural_title: String,
    sort_by: String,
    sort_direction: SortDirection,
    state: CollectionViewState<S::Row>,
    generation: u64,
    delete_pending: bool,
}

impl<S: CollectionSource> CollectionController<S> {
    /// Controller for a freshly mounted screen. The first fetch is wanted
    /// right away (`loading` is set).
    pub fn new(source: Arc<S>, plural_title: impl Into<String>, rows_per_page: u32) -> Self {
        Self {
            source,
            plural_title: plural_title.into(),
            sort_by: "id".to_string(),
            sort_direction: SortDirection::Desc,
            state: CollectionViewState::new(rows_per_page),
            generation: 0,
            delete_pending: false,
        }
    }

    #[must_use]
    pub fn with_sort(mut self, sort_by: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_by = sort_by.into();
        self.sort_direction = direction;
        self
    }

    pub fn state(&self) -> &CollectionViewState<S::Row> {
        &self.state
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn plural_title(&self) -> &str {
        &self.plural_title
    }

    /// Generation of the most recently issued fetch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ===== Triggers =====

    /// Apply a settled search value: back to page 1 and reload.
    pub fn search(&mut self, query: impl Into<String>) -> FetchTicket {
        self.state.search_query = query.into();
        self.state.search_changed = true;
        self.state.page = 1;
        self.begin_fetch()
    }

    /// Move to `page`. `None` when already there.
    pub fn change_page(&mut self, page: u32) -> Option<FetchTicket> {
        let page = page.max(1);
        if page == self.state.page {
            return None;
        }
        self.state.page = page;
        Some(self.begin_fetch())
    }

    /// Reload the current page as is.
    pub fn refresh(&mut self) -> FetchTicket {
        self.begin_fetch()
    }

    // ===== Selection & delete =====

    pub fn toggle_selected(&mut self, id: RowId) {
        if !self.state.selected.remove(&id) {
            self.state.selected.insert(id);
        }
    }

    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = RowId>) {
        self.state.selected = ids.into_iter().collect();
    }

    pub fn clear_selection(&mut self) {
        self.state.selected.clear();
    }

    /// Confirmation for deleting the checked rows on the current page.
    pub fn request_delete(&self) -> DeleteConfirmation {
        self.request_delete_of(&self.state.selected)
    }

    /// Confirmation for deleting `selected`, restricted to the current page.
    pub fn request_delete_of(&self, selected: &BTreeSet<RowId>) -> DeleteConfirmation {
        prepare_delete(
            self.source.as_ref(),
            &self.plural_title,
            selected,
            &self.state.rows,
        )
    }

    /// The user confirmed: delete the targets as part of the next fetch.
    ///
    /// `None` when there is nothing to delete.
    pub fn confirm_delete(&mut self, confirmation: DeleteConfirmation) -> Option<FetchTicket> {
        if confirmation.is_empty() {
            log::debug!("[{}] Nothing to delete", self.source.endpoint());
            return None;
        }
        log::info!(
            "[{}] Deleting {} record(s)",
            self.source.endpoint(),
            confirmation.len()
        );
        self.state.delete_ids = confirmation.target_ids;
        self.delete_pending = true;
        Some(self.begin_fetch())
    }

    /// The user backed out. Nothing changes.
    pub fn cancel_delete(&self, confirmation: DeleteConfirmation) {
        log::debug!(
            "[{}] Delete of {} record(s) cancelled",
            self.source.endpoint(),
            confirmation.len()
        );
    }

    // ===== Fetch cycle =====

    /// Issue a fetch for the current state. Supersedes every earlier ticket.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.state.loading = true;

        let delete_ids = if std::mem::take(&mut self.delete_pending) {
            self.state.delete_ids.clone()
        } else {
            Vec::new()
        };

        FetchTicket {
            generation: self.generation,
            query: PageQuery {
                sort_by: self.sort_by.clone(),
                sort_direction: self.sort_direction,
                limit: self.state.rows_per_page,
                search: self.state.search_query.clone(),
                page: self.state.page,
            },
            delete_ids,
            refetches: 0,
        }
    }

    /// Merge a finished request into the view state.
    pub fn complete(&mut self, done: CompletedFetch<S::Row>) -> FetchOutcome {
        let CompletedFetch { ticket, result } = done;
        if ticket.generation != self.generation {
            log::debug!(
                "[{}] Discarding stale fetch {} (latest {})",
                self.source.endpoint(),
                ticket.generation,
                self.generation
            );
            return FetchOutcome::Stale;
        }

        match result {
            Ok(page) => {
                match reconcile(ticket.query.page, page.last_page, page.current_page) {
                    ReconcileAction::RefetchAt(target) if ticket.refetches < MAX_REFETCHES => {
                        // Any delete already happened on the server
                        for id in &ticket.delete_ids {
                            self.state.selected.remove(id);
                        }
                        self.state.delete_ids.clear();
                        self.delete_pending = false;
                        self.state.page = target;
                        let mut next = self.begin_fetch();
                        next.refetches = ticket.refetches + 1;
                        FetchOutcome::Refetch(next)
                    }
                    ReconcileAction::RefetchAt(_) => {
                        log::warn!(
                            "[{}] Server keeps answering out of range, taking page as is",
                            self.source.endpoint()
                        );
                        self.apply(page, &ticket);
                        FetchOutcome::Applied
                    }
                    ReconcileAction::Accept => {
                        self.apply(page, &ticket);
                        FetchOutcome::Applied
                    }
                }
            }
            Err(e) => {
                e.log(&format!("[{}] Fetch failed", self.source.endpoint()));
                self.state.delete_ids.clear();
                self.state.loading = false;
                FetchOutcome::Failed(e)
            }
        }
    }

    /// Execute `ticket` and any follow-ups until the state settles.
    pub async fn run(&mut self, ticket: FetchTicket) -> CoreResult<()> {
        let mut ticket = ticket;
        loop {
            let done = execute_fetch(self.source.as_ref(), ticket).await;
            match self.complete(done) {
                FetchOutcome::Applied | FetchOutcome::Stale => return Ok(()),
                FetchOutcome::Refetch(next) => ticket = next,
                FetchOutcome::Failed(e) => return Err(e),
            }
        }
    }

    /// Fetch the current page.
    pub async fn load(&mut self) -> CoreResult<()> {
        let ticket = self.begin_fetch();
        self.run(ticket).await
    }

    fn apply(&mut self, page: PageResponse<S::Row>, ticket: &FetchTicket) {
        for id in ticket.delete_ids.iter().chain(&self.state.delete_ids) {
            self.state.selected.remove(id);
        }
        self.state.delete_ids.clear();

        self.state.row_count = page.total;
        self.state.page_count = page_count(page.total, self.state.rows_per_page);
        self.state.page = page.current_page.min(page.last_page.max(1)).max(1);
        self.state.rows = page.data;
        self.state.search_changed = false;
        self.state.loading = false;
        log::debug!(
            "[{}] Page {}/{} applied ({} rows total)",
            self.source.endpoint(),
            self.state.page,
            self.state.page_count,
            self.state.row_count
        );
    }
}
