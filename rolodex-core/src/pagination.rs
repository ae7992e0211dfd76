//! Keeps the displayed page inside the server-reported range.

/// What to do with a page response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// The page exists; apply the rows.
    Accept,
    /// The requested page no longer exists; fetch this one instead.
    RefetchAt(u32),
}

/// Decide whether a response may be applied.
///
/// A server evaluating a page beyond `server_last_page` (for example page 2
/// after a delete emptied it) answers with an empty row set; that must not
/// reach the view. An empty result set reported on page 1 with a last page
/// of `0` is accepted as is.
pub fn reconcile(
    requested_page: u32,
    server_last_page: u32,
    server_current_page: u32,
) -> ReconcileAction {
    let target = server_last_page.max(1);
    if server_current_page > server_last_page && target != server_current_page {
        log::debug!(
            "Page {requested_page} out of range (server at {server_current_page}, last {server_last_page}), refetching page {target}"
        );
        ReconcileAction::RefetchAt(target)
    } else {
        ReconcileAction::Accept
    }
}

/// Number of pages needed for `row_count` rows; `0` when there are none.
pub fn page_count(row_count: u64, rows_per_page: u32) -> u32 {
    let per_page = u64::from(rows_per_page.max(1));
    u32::try_from(row_count.div_ceil(per_page)).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(12, 10), 2);
        assert_eq!(page_count(20, 10), 2);
        assert_eq!(page_count(21, 10), 3);
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(5, 0), 5);
    }

    #[test]
    fn out_of_range_page_is_refetched_at_last_page() {
        assert_eq!(reconcile(2, 1, 2), ReconcileAction::RefetchAt(1));
        assert_eq!(reconcile(9, 3, 9), ReconcileAction::RefetchAt(3));
    }

    #[test]
    fn empty_result_set_refetches_first_page() {
        assert_eq!(reconcile(2, 0, 2), ReconcileAction::RefetchAt(1));
    }

    #[test]
    fn empty_first_page_is_accepted() {
        assert_eq!(reconcile(1, 0, 1), ReconcileAction::Accept);
    }

    #[test]
    fn in_range_page_is_accepted() {
        assert_eq!(reconcile(2, 2, 2), ReconcileAction::Accept);
        assert_eq!(reconcile(1, 5, 1), ReconcileAction::Accept);
        // Server clamped on its own: accept what it evaluated.
        assert_eq!(reconcile(7, 3, 3), ReconcileAction::Accept);
    }
}
