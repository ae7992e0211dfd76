//! Test helpers
//!
//! Scripted sources and convenience factories shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use rolodex_provider::{
    InMemoryResourceClient, PageQuery, PageResponse, ResourceClient, Result as ProviderResult,
    RowId,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::collection::CollectionSource;
use crate::error::{CoreError, CoreResult};
use crate::types::Company;

pub fn company(id: u64, name: &str) -> Company {
    Company {
        id: RowId(id),
        name: name.to_string(),
        full_address: None,
        phone: None,
        email: None,
        avatar: None,
    }
}

/// In-memory client holding `Company 1` .. `Company n` under `/companies`.
pub async fn seeded_companies(n: u64) -> Arc<InMemoryResourceClient> {
    let client = Arc::new(InMemoryResourceClient::new());
    client
        .seed(
            "/companies",
            (1..=n).map(|id| json!({"id": id, "name": format!("Company {id}")})),
        )
        .await;
    client
}

// ===== StaticSource =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Fetch(PageQuery),
    Delete(Vec<RowId>, PageQuery),
}

/// Source answering from a queue of canned responses.
#[derive(Default)]
pub struct StaticSource {
    responses: Mutex<VecDeque<CoreResult<PageResponse<Company>>>>,
    calls: Mutex<Vec<SourceCall>>,
}

impl StaticSource {
    pub async fn push(&self, response: CoreResult<PageResponse<Company>>) {
        self.responses.lock().await.push_back(response);
    }

    pub async fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().await.clone()
    }

    async fn next(&self) -> CoreResult<PageResponse<Company>> {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(CoreError::InvalidState("no scripted response".into())))
    }
}

#[async_trait]
impl CollectionSource for StaticSource {
    type Row = Company;

    fn endpoint(&self) -> &str {
        "/static"
    }

    async fn fetch_page(&self, query: &PageQuery) -> CoreResult<PageResponse<Company>> {
        self.calls.lock().await.push(SourceCall::Fetch(query.clone()));
        self.next().await
    }

    async fn delete_by_ids(
        &self,
        ids: &[RowId],
        query: &PageQuery,
    ) -> CoreResult<PageResponse<Company>> {
        self.calls
            .lock()
            .await
            .push(SourceCall::Delete(ids.to_vec(), query.clone()));
        self.next().await
    }
}

// ===== GatedClient =====

/// Wraps a client so every request waits for a permit.
///
/// Lets tests hold requests in flight and release them one by one.
pub struct GatedClient {
    inner: Arc<InMemoryResourceClient>,
    gate: tokio::sync::Semaphore,
}

impl GatedClient {
    pub fn new(inner: Arc<InMemoryResourceClient>) -> Self {
        Self {
            inner,
            gate: tokio::sync::Semaphore::new(0),
        }
    }

    /// Let `n` more requests through.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Let every request through from now on.
    pub fn open_gate(&self) {
        self.gate.add_permits(1 << 20);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

#[async_trait]
impl ResourceClient for GatedClient {
    fn id(&self) -> &'static str {
        "gated"
    }

    async fn list(&self, endpoint: &str, query: &PageQuery) -> ProviderResult<PageResponse<Value>> {
        self.pass().await;
        self.inner.list(endpoint, query).await
    }

    async fn delete(
        &self,
        endpoint: &str,
        ids: &[RowId],
        query: &PageQuery,
    ) -> ProviderResult<PageResponse<Value>> {
        self.pass().await;
        self.inner.delete(endpoint, ids, query).await
    }

    async fn get(&self, endpoint: &str, id: RowId) -> ProviderResult<Value> {
        self.pass().await;
        self.inner.get(endpoint, id).await
    }

    async fn save(&self, endpoint: &str, id: Option<RowId>, body: &Value) -> ProviderResult<Value> {
        self.pass().await;
        self.inner.save(endpoint, id, body).await
    }
}

// ===== AckOnlyClient =====

/// Wraps a client whose saves answer with an empty body.
pub struct AckOnlyClient {
    inner: Arc<InMemoryResourceClient>,
}

impl AckOnlyClient {
    pub fn new(inner: Arc<InMemoryResourceClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ResourceClient for AckOnlyClient {
    fn id(&self) -> &'static str {
        "ack-only"
    }

    async fn list(&self, endpoint: &str, query: &PageQuery) -> ProviderResult<PageResponse<Value>> {
        self.inner.list(endpoint, query).await
    }

    async fn delete(
        &self,
        endpoint: &str,
        ids: &[RowId],
        query: &PageQuery,
    ) -> ProviderResult<PageResponse<Value>> {
        self.inner.delete(endpoint, ids, query).await
    }

    async fn get(&self, endpoint: &str, id: RowId) -> ProviderResult<Value> {
        self.inner.get(endpoint, id).await
    }

    async fn save(&self, endpoint: &str, id: Option<RowId>, body: &Value) -> ProviderResult<Value> {
        self.inner.save(endpoint, id, body).await?;
        Ok(Value::Null)
    }
}
