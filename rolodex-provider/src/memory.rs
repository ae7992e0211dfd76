//! In-process [`ResourceClient`] with the same paging contract as the API.
//!
//! Used by tests and by offline demos. Requests are recorded so callers can
//! assert on what would have gone over the wire.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{ProviderError, Result};
use crate::traits::ResourceClient;
use crate::types::{PageQuery, PageResponse, RowId, SortDirection, join_ids};

/// One request observed by [`InMemoryResourceClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    List { endpoint: String, query: PageQuery },
    Delete { endpoint: String, path: String, query: PageQuery },
    Get { endpoint: String, id: RowId },
    Save { endpoint: String, id: Option<RowId>, body: Value },
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<String, BTreeMap<RowId, Value>>,
    next_id: u64,
    calls: Vec<RecordedCall>,
    failures: BTreeMap<String, VecDeque<ProviderError>>,
}

/// In-memory collections keyed by endpoint.
#[derive(Debug, Default)]
pub struct InMemoryResourceClient {
    inner: Mutex<Inner>,
}

impl InMemoryResourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows into `endpoint`. Each row must carry a numeric `id`.
    pub async fn seed(&self, endpoint: &str, rows: impl IntoIterator<Item = Value>) {
        let mut inner = self.inner.lock().await;
        let mut max_id = inner.next_id;
        let table = inner.tables.entry(normalize(endpoint)).or_default();
        for row in rows {
            if let Some(id) = row.get("id").and_then(Value::as_u64) {
                max_id = max_id.max(id);
                table.insert(RowId(id), row);
            }
        }
        inner.next_id = max_id;
    }

    /// Make the next request against `endpoint` fail with `error`.
    pub async fn fail_next(&self, endpoint: &str, error: ProviderError) {
        self.inner
            .lock()
            .await
            .failures
            .entry(normalize(endpoint))
            .or_default()
            .push_back(error);
    }

    /// Requests seen so far, oldest first.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Number of rows stored under `endpoint`.
    pub async fn len(&self, endpoint: &str) -> usize {
        self.inner
            .lock()
            .await
            .tables
            .get(&normalize(endpoint))
            .map_or(0, BTreeMap::len)
    }

    /// Whether `endpoint` holds no rows.
    pub async fn is_empty(&self, endpoint: &str) -> bool {
        self.len(endpoint).await == 0
    }
}

fn normalize(endpoint: &str) -> String {
    format!("/{}", endpoint.trim_matches('/'))
}

fn take_failure(inner: &mut Inner, endpoint: &str) -> Result<()> {
    match inner.failures.get_mut(endpoint).and_then(VecDeque::pop_front) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn matches_search(row: &Value, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    match row {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|v| matches_search(v, needle)),
        Value::Object(map) => map.values().any(|v| matches_search(v, needle)),
        _ => false,
    }
}

fn page_of(table: Option<&BTreeMap<RowId, Value>>, query: &PageQuery) -> PageResponse<Value> {
    let needle = query.search.trim().to_lowercase();
    let mut rows: Vec<&Value> = table
        .into_iter()
        .flat_map(BTreeMap::values)
        .filter(|row| matches_search(row, &needle))
        .collect();
    if query.sort_direction == SortDirection::Desc {
        rows.reverse();
    }

    let limit = query.limit.max(1);
    let page = query.page.max(1);
    let total = rows.len() as u64;
    let skip = usize::try_from(u64::from(page - 1) * u64::from(limit)).unwrap_or(usize::MAX);
    let data = rows
        .into_iter()
        .skip(skip)
        .take(limit as usize)
        .cloned()
        .collect();

    // Out-of-range pages come back empty with current_page > last_page.
    PageResponse::new(data, page, limit, total)
}

#[async_trait]
impl ResourceClient for InMemoryResourceClient {
    fn id(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, endpoint: &str, query: &PageQuery) -> Result<PageResponse<Value>> {
        let endpoint = normalize(endpoint);
        let mut inner = self.inner.lock().await;
        inner.calls.push(RecordedCall::List {
            endpoint: endpoint.clone(),
            query: query.clone(),
        });
        take_failure(&mut inner, &endpoint)?;
        Ok(page_of(inner.tables.get(&endpoint), query))
    }

    async fn delete(
        &self,
        endpoint: &str,
        ids: &[RowId],
        query: &PageQuery,
    ) -> Result<PageResponse<Value>> {
        let endpoint = normalize(endpoint);
        let mut inner = self.inner.lock().await;
        inner.calls.push(RecordedCall::Delete {
            endpoint: endpoint.clone(),
            path: join_ids(ids),
            query: query.clone(),
        });
        take_failure(&mut inner, &endpoint)?;
        if let Some(table) = inner.tables.get_mut(&endpoint) {
            for id in ids {
                table.remove(id);
            }
        }
        log::debug!("[{endpoint}] deleted {}", join_ids(ids));
        Ok(page_of(inner.tables.get(&endpoint), query))
    }

    async fn get(&self, endpoint: &str, id: RowId) -> Result<Value> {
        let endpoint = normalize(endpoint);
        let mut inner = self.inner.lock().await;
        inner.calls.push(RecordedCall::Get {
            endpoint: endpoint.clone(),
            id,
        });
        take_failure(&mut inner, &endpoint)?;
        inner
            .tables
            .get(&endpoint)
            .and_then(|t| t.get(&id))
            .cloned()
            .ok_or_else(|| ProviderError::RecordNotFound {
                endpoint,
                id: id.to_string(),
            })
    }

    async fn save(&self, endpoint: &str, id: Option<RowId>, body: &Value) -> Result<Value> {
        let endpoint = normalize(endpoint);
        let mut inner = self.inner.lock().await;
        inner.calls.push(RecordedCall::Save {
            endpoint: endpoint.clone(),
            id,
            body: body.clone(),
        });
        take_failure(&mut inner, &endpoint)?;

        let id = match id {
            Some(id) => id,
            None => {
                inner.next_id += 1;
                RowId(inner.next_id)
            }
        };
        let mut record = inner
            .tables
            .get(&endpoint)
            .and_then(|t| t.get(&id))
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        if let (Value::Object(target), Value::Object(patch)) = (&mut record, body) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
            target.insert("id".to_string(), Value::from(id.0));
        }
        inner
            .tables
            .entry(endpoint)
            .or_default()
            .insert(id, record.clone());
        Ok(record)
    }
}
