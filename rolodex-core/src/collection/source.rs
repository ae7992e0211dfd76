use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use rolodex_provider::{PageQuery, PageResponse, ProviderError, ResourceClient, RowId};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CoreResult;
use crate::types::Record;

/// Where a list screen gets its rows from.
///
/// [`RemoteCollection`] covers every REST endpoint; tests substitute their
/// own sources.
#[async_trait]
pub trait CollectionSource: Send + Sync + 'static {
    type Row: Record;

    /// Endpoint name, used in logs.
    fn endpoint(&self) -> &str;

    async fn fetch_page(&self, query: &PageQuery) -> CoreResult<PageResponse<Self::Row>>;

    /// Delete `ids` and return the page described by `query`.
    async fn delete_by_ids(
        &self,
        ids: &[RowId],
        query: &PageQuery,
    ) -> CoreResult<PageResponse<Self::Row>>;

    /// Confirmation line for `row`.
    fn label(&self, row: &Self::Row) -> String {
        row.display_label()
    }
}

/// [`CollectionSource`] backed by a [`ResourceClient`] endpoint.
pub struct RemoteCollection<R> {
    client: Arc<dyn ResourceClient>,
    endpoint: String,
    _row: PhantomData<fn() -> R>,
}

impl<R> RemoteCollection<R> {
    pub fn new(client: Arc<dyn ResourceClient>, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            _row: PhantomData,
        }
    }
}

impl<R: DeserializeOwned> RemoteCollection<R> {
    fn decode(&self, page: PageResponse<Value>) -> CoreResult<PageResponse<R>> {
        page.try_map(serde_json::from_value::<R>).map_err(|e| {
            ProviderError::ParseError {
                endpoint: self.endpoint.clone(),
                detail: format!("unexpected row shape: {e}"),
            }
            .into()
        })
    }
}

#[async_trait]
impl<R> CollectionSource for RemoteCollection<R>
where
    R: Record + DeserializeOwned,
{
    type Row = R;

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_page(&self, query: &PageQuery) -> CoreResult<PageResponse<R>> {
        let page = self.client.list(&self.endpoint, query).await?;
        self.decode(page)
    }

    async fn delete_by_ids(&self, ids: &[RowId], query: &PageQuery) -> CoreResult<PageResponse<R>> {
        let page = self.client.delete(&self.endpoint, ids, query).await?;
        self.decode(page)
    }
}
