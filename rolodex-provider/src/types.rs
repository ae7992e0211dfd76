use std::fmt;

use serde::{Deserialize, Serialize};

// ============ Identity ============

/// Stable unique identifier of a remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RowId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Join ids into the comma separated path segment used by bulk deletes.
///
/// `[3, 1, 2]` becomes `"3,1,2"`; input order is preserved.
pub fn join_ids(ids: &[RowId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

// ============ Query ============

/// Sort direction accepted by collection endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Query parameters sent with every list (and bulk delete) request.
///
/// Pages are 1-indexed.
///
/// # Default
///
/// `sortBy = "id"`, `sortDirection = desc`, `limit = 20`, empty search, `page = 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// Column to sort by.
    pub sort_by: String,
    /// Sort direction.
    pub sort_direction: SortDirection,
    /// Number of rows per page.
    pub limit: u32,
    /// Free text search, empty means "everything".
    pub search: String,
    /// Page number (1-indexed).
    pub page: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            sort_by: "id".to_string(),
            sort_direction: SortDirection::Desc,
            limit: 20,
            search: String::new(),
            page: 1,
        }
    }
}

impl PageQuery {
    /// Clamp values to valid ranges.
    ///
    /// - `page` is clamped to `>= 1`
    /// - `limit` is clamped to `1..=max_limit`
    #[must_use]
    pub fn validated(&self, max_limit: u32) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, max_limit.max(1)),
            ..self.clone()
        }
    }

    /// Query string pairs in the order the endpoints document them.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sortBy", self.sort_by.clone()),
            ("sortDirection", self.sort_direction.as_str().to_string()),
            ("limit", self.limit.to_string()),
            ("search", self.search.clone()),
            ("page", self.page.to_string()),
        ]
    }
}

// ============ Response ============

/// One page of a remote collection, in the shape the console API returns.
///
/// Missing counters default to zero (and `current_page` to 1) so a sparse
/// body still decodes into a consistent empty page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// Rows on the returned page.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Total number of rows matching the query across all pages.
    #[serde(default)]
    pub total: u64,
    /// Page the server actually evaluated.
    #[serde(default = "first_page")]
    pub current_page: u32,
    /// Last page that exists for this query (at least 1).
    #[serde(default = "first_page")]
    pub last_page: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> PageResponse<T> {
    /// Build a response for `page` out of `total` rows, computing `last_page`.
    pub fn new(data: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let per_page = u64::from(per_page.max(1));
        let last_page = u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX).max(1);
        Self {
            data,
            total,
            current_page: page,
            last_page,
        }
    }

    /// Convert row payloads, keeping the paging counters.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<PageResponse<U>, E> {
        let data = self.data.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(PageResponse {
            data,
            total: self.total,
            current_page: self.current_page,
            last_page: self.last_page,
        })
    }
}
