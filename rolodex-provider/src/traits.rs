use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{PageQuery, PageResponse, RowId};

/// Transport for paged REST collections.
///
/// Every method takes the collection `endpoint` (for example `/contacts`)
/// so one client serves every screen.
///
/// | operation | request |
/// |-----------|---------|
/// | [`list`](Self::list) | `GET <endpoint>?sortBy&sortDirection&limit&search&page` |
/// | [`delete`](Self::delete) | `DELETE <endpoint>/<id1,id2,...>` with the same query |
/// | [`get`](Self::get) | `GET <endpoint>/<id>` |
/// | [`save`](Self::save) | `POST <endpoint>` (create) or `POST <endpoint>/<id>` (update) |
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Client identifier, used in log lines.
    fn id(&self) -> &'static str;

    /// Fetch one page of the collection.
    async fn list(&self, endpoint: &str, query: &PageQuery) -> Result<PageResponse<Value>>;

    /// Delete `ids` in a single request, then return the page described by `query`.
    ///
    /// `ids` must not be empty.
    async fn delete(
        &self,
        endpoint: &str,
        ids: &[RowId],
        query: &PageQuery,
    ) -> Result<PageResponse<Value>>;

    /// Fetch the full record `id`.
    async fn get(&self, endpoint: &str, id: RowId) -> Result<Value>;

    /// Create (`id == None`) or update a record. Returns the server's echo.
    async fn save(&self, endpoint: &str, id: Option<RowId>, body: &Value) -> Result<Value>;
}
