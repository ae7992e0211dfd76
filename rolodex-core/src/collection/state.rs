use std::collections::BTreeSet;

use rolodex_provider::RowId;

/// Everything a list screen renders.
///
/// Owned by exactly one screen; only its controller writes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionViewState<R> {
    pub search_query: String,
    /// Set by a search, cleared by the next applied fetch.
    pub search_changed: bool,
    /// Current page, 1-indexed.
    pub page: u32,
    pub rows_per_page: u32,
    /// Total rows matching the search on the server.
    pub row_count: u64,
    /// `ceil(row_count / rows_per_page)`.
    pub page_count: u32,
    pub rows: Vec<R>,
    /// A fetch is wanted or in flight.
    pub loading: bool,
    /// Ids confirmed for deletion, in row order. Non-empty only until the
    /// next fetch settles.
    pub delete_ids: Vec<RowId>,
    /// Checked rows. May include ids that are not on the current page.
    pub selected: BTreeSet<RowId>,
}

impl<R> CollectionViewState<R> {
    /// State of a freshly mounted screen: loading page 1.
    pub fn new(rows_per_page: u32) -> Self {
        Self {
            search_query: String::new(),
            search_changed: false,
            page: 1,
            rows_per_page: rows_per_page.max(1),
            row_count: 0,
            page_count: 0,
            rows: Vec::new(),
            loading: true,
            delete_ids: Vec::new(),
            selected: BTreeSet::new(),
        }
    }

    /// Pager controls are hidden while a search is loading and when there
    /// is only one page.
    pub fn pagination_visible(&self) -> bool {
        (!self.loading || !self.search_changed) && self.page_count > 1
    }
}
