use std::collections::BTreeSet;

use rolodex_provider::RowId;

use super::source::CollectionSource;
use crate::types::Record;

/// What the user is asked to confirm before a bulk delete.
///
/// Built from the rows currently on screen; discarded once the user answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub title: String,
    /// Ids to delete, in row order.
    pub target_ids: Vec<RowId>,
    /// Heading line followed by one label per target.
    pub rendered_summary: Vec<String>,
}

impl DeleteConfirmation {
    pub fn is_empty(&self) -> bool {
        self.target_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.target_ids.len()
    }
}

/// Build the confirmation for deleting `selected` out of `current_rows`.
///
/// Only rows loaded on the current page take part; selected ids that are not
/// on it are dropped without error.
pub fn prepare_delete<S: CollectionSource>(
    source: &S,
    plural_title: &str,
    selected: &BTreeSet<RowId>,
    current_rows: &[S::Row],
) -> DeleteConfirmation {
    let mut target_ids = Vec::new();
    let mut rendered_summary = vec![format!("The following {plural_title} will be deleted:")];

    for row in current_rows {
        let id = row.row_id();
        if selected.contains(&id) {
            target_ids.push(id);
            rendered_summary.push(source.label(row));
        }
    }

    let skipped = selected.len().saturating_sub(target_ids.len());
    if skipped > 0 {
        log::debug!(
            "[{}] {skipped} selected id(s) not on the current page, ignoring",
            source.endpoint()
        );
    }

    DeleteConfirmation {
        title: "Confirm Delete".to_string(),
        target_ids,
        rendered_summary,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_utils::{StaticSource, company};

    #[test]
    fn only_rows_on_page_are_targeted() {
        let source = StaticSource::default();
        let rows = vec![company(5, "Acme"), company(4, "Initech"), company(3, "Hooli")];
        let selected: BTreeSet<RowId> = [RowId(3), RowId(5), RowId(99)].into_iter().collect();

        let confirmation = prepare_delete(&source, "Companies", &selected, &rows);
        assert_eq!(confirmation.target_ids, vec![RowId(5), RowId(3)]);
        assert_eq!(
            confirmation.rendered_summary,
            vec![
                "The following Companies will be deleted:".to_string(),
                "Acme".to_string(),
                "Hooli".to_string()
            ]
        );
        assert_eq!(confirmation.title, "Confirm Delete");
        assert_eq!(confirmation.len(), 2);
    }

    #[test]
    fn stale_selection_yields_empty_confirmation() {
        let source = StaticSource::default();
        let rows = vec![company(1, "Acme")];
        let selected: BTreeSet<RowId> = [RowId(7)].into_iter().collect();

        let confirmation = prepare_delete(&source, "Companies", &selected, &rows);
        assert!(confirmation.is_empty());
        assert_eq!(confirmation.rendered_summary.len(), 1);
    }
}
