//! REST transport over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use url::Url;

use crate::error::{ProviderError, Result};
use crate::http_client::HttpUtils;
use crate::traits::ResourceClient;
use crate::types::{PageQuery, PageResponse, RowId, join_ids};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ResourceClient`] talking to the console's JSON API.
///
/// Only `GET` requests are retried on transient failures.
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl HttpResourceClient {
    /// Create a client rooted at `base_url` (for example `https://crm.example.com/api`).
    pub fn new(base_url: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        Url::parse(base_url).map_err(|e| ProviderError::NetworkError {
            endpoint: base_url.to_string(),
            detail: format!("invalid base url: {e}"),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NetworkError {
                endpoint: base_url.to_string(),
                detail: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str, tail: Option<&str>) -> String {
        let endpoint = endpoint.trim_matches('/');
        match tail {
            Some(tail) => format!("{}/{endpoint}/{tail}", self.base_url),
            None => format!("{}/{endpoint}", self.base_url),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Accept", "application/json")
            .header("X-Requested-With", "XMLHttpRequest")
    }

    async fn send(
        &self,
        request: RequestBuilder,
        endpoint: &str,
        method: &Method,
        url: &str,
        record_id: Option<&str>,
    ) -> Result<String> {
        // Writes are sent once; the server may have applied them already.
        let retries = if *method == Method::GET {
            self.max_retries
        } else {
            0
        };
        let (status, body) = HttpUtils::execute_request_with_retry(
            request,
            endpoint,
            method.as_str(),
            url,
            retries,
        )
        .await?;
        HttpUtils::check_status(status, &body, endpoint, record_id)?;
        Ok(body)
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    fn id(&self) -> &'static str {
        "http"
    }

    async fn list(&self, endpoint: &str, query: &PageQuery) -> Result<PageResponse<Value>> {
        let url = self.url(endpoint, None);
        let request = self.request(Method::GET, &url).query(&query.to_pairs());
        let body = self.send(request, endpoint, &Method::GET, &url, None).await?;
        HttpUtils::parse_json(&body, endpoint)
    }

    async fn delete(
        &self,
        endpoint: &str,
        ids: &[RowId],
        query: &PageQuery,
    ) -> Result<PageResponse<Value>> {
        if ids.is_empty() {
            return Err(ProviderError::SerializationError {
                endpoint: endpoint.to_string(),
                detail: "bulk delete needs at least one id".to_string(),
            });
        }

        let joined = join_ids(ids);
        let url = self.url(endpoint, Some(&joined));
        let request = self.request(Method::DELETE, &url).query(&query.to_pairs());
        let body = self
            .send(request, endpoint, &Method::DELETE, &url, Some(&joined))
            .await?;

        // The API may answer a delete with the refreshed page or with nothing.
        let page = serde_json::from_str::<Value>(&body)
            .ok()
            .filter(|v| v.get("data").is_some())
            .map(serde_json::from_value::<PageResponse<Value>>);
        match page {
            Some(Ok(page)) => Ok(page),
            _ => {
                log::debug!("[{endpoint}] Delete returned no page, listing");
                self.list(endpoint, query).await
            }
        }
    }

    async fn get(&self, endpoint: &str, id: RowId) -> Result<Value> {
        let id = id.to_string();
        let url = self.url(endpoint, Some(&id));
        let request = self.request(Method::GET, &url);
        let body = self
            .send(request, endpoint, &Method::GET, &url, Some(&id))
            .await?;
        HttpUtils::parse_json(&body, endpoint)
    }

    async fn save(&self, endpoint: &str, id: Option<RowId>, body: &Value) -> Result<Value> {
        let id = id.map(|id| id.to_string());
        let url = self.url(endpoint, id.as_deref());
        let request = self.request(Method::POST, &url).json(body);
        let text = self
            .send(request, endpoint, &Method::POST, &url, id.as_deref())
            .await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        HttpUtils::parse_json(&text, endpoint)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slashes() {
        let client = HttpResourceClient::new("http://localhost:8000/api/", DEFAULT_TIMEOUT, 0).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(
            client.url("/contacts", None),
            "http://localhost:8000/api/contacts"
        );
        assert_eq!(
            client.url("contacts/", Some("1,2")),
            "http://localhost:8000/api/contacts/1,2"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        let client = HttpResourceClient::new("not a url", DEFAULT_TIMEOUT, 0);
        assert!(matches!(client, Err(ProviderError::NetworkError { .. })));
    }
}
