//! HTTP request plumbing shared by the REST transport.
//!
//! Sending, status classification, body logging and retry live here so the
//! resource client only has to build `RequestBuilder`s.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::RequestBuilder;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::utils::log_sanitizer::truncate_for_log;

/// HTTP tool function set
pub struct HttpUtils;

/// Error body returned by the console API (`422` and friends).
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

impl HttpUtils {
    /// Send a request and return `(status, body)`.
    ///
    /// Transport failures, HTTP 429 and 502-504 are turned into retryable
    /// errors here; every other status is returned to the caller.
    pub async fn execute_request(
        request_builder: RequestBuilder,
        endpoint: &str,
        method_name: &str,
        url: &str,
    ) -> Result<(u16, String), ProviderError> {
        log::debug!("[{endpoint}] {method_name} {url}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    endpoint: endpoint.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ProviderError::NetworkError {
                    endpoint: endpoint.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[{endpoint}] Response Status: {status_code}");

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if status_code == 429 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{endpoint}] Rate limited (HTTP 429), retry_after={retry_after:?}");
            return Err(ProviderError::RateLimited {
                endpoint: endpoint.to_string(),
                retry_after,
                raw_message: Some(body),
            });
        }

        if matches!(status_code, 502..=504) {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{endpoint}] Server error (HTTP {status_code})");
            return Err(ProviderError::NetworkError {
                endpoint: endpoint.to_string(),
                detail: format!("HTTP {status_code}: {}", truncate_for_log(&body)),
            });
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError {
                endpoint: endpoint.to_string(),
                detail: format!("Failed to read response body: {e}"),
            })?;

        log::debug!(
            "[{endpoint}] Response Body: {}",
            truncate_for_log(&response_text)
        );

        Ok((status_code, response_text))
    }

    /// Map a non-2xx status to a [`ProviderError`]. `Ok(())` for success codes.
    ///
    /// `record_id` names the addressed record for 404s on single-record calls.
    pub fn check_status(
        status: u16,
        body: &str,
        endpoint: &str,
        record_id: Option<&str>,
    ) -> Result<(), ProviderError> {
        if (200..300).contains(&status) {
            return Ok(());
        }

        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let raw_message = parsed.message.clone().or_else(|| {
            (!body.trim().is_empty()).then(|| truncate_for_log(body))
        });
        let endpoint = endpoint.to_string();

        let err = match status {
            401 | 419 => ProviderError::Unauthenticated {
                endpoint,
                raw_message,
            },
            403 => ProviderError::PermissionDenied {
                endpoint,
                raw_message,
            },
            404 => ProviderError::RecordNotFound {
                endpoint,
                id: record_id.unwrap_or_default().to_string(),
            },
            422 => ProviderError::ValidationFailed {
                endpoint,
                fields: parsed.errors,
            },
            _ => ProviderError::Unknown {
                endpoint,
                status,
                raw_message: raw_message.unwrap_or_default(),
            },
        };

        if err.is_expected() {
            log::warn!("{err}");
        } else {
            log::error!("{err}");
        }
        Err(err)
    }

    /// Parse a JSON body.
    pub fn parse_json<T>(response_text: &str, endpoint: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("[{endpoint}] JSON parse failed: {e}");
            log::error!(
                "[{endpoint}] Raw response: {}",
                truncate_for_log(response_text)
            );
            ProviderError::ParseError {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// [`execute_request`](Self::execute_request) with retries on transient failures.
    ///
    /// # Retry strategy
    /// - Only retryable errors (network, timeout, 429) are retried
    /// - Exponential backoff: 100ms, 200ms, 400ms, ... capped at 10 seconds
    /// - `Retry-After` on a 429 wins over the backoff, capped at 30 seconds
    pub async fn execute_request_with_retry(
        request_builder: RequestBuilder,
        endpoint: &str,
        method_name: &str,
        url: &str,
        max_retries: u32,
    ) -> Result<(u16, String), ProviderError> {
        if max_retries == 0 {
            return Self::execute_request(request_builder, endpoint, method_name, url).await;
        }

        let mut last_error = None;

        for attempt in 0..=max_retries {
            // RequestBuilder is single use
            let Some(req) = request_builder.try_clone() else {
                log::warn!("[{endpoint}] Cannot clone request, disabling retry");
                return Self::execute_request(request_builder, endpoint, method_name, url).await;
            };

            match Self::execute_request(req, endpoint, method_name, url).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < max_retries && e.is_retryable() => {
                    let delay = retry_delay(&e, attempt);
                    log::warn!(
                        "[{}] Request failed (attempt {}/{}), retrying in {:.1}s: {}",
                        endpoint,
                        attempt + 1,
                        max_retries,
                        delay.as_secs_f32(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::NetworkError {
            endpoint: endpoint.to_string(),
            detail: "All retries exhausted with no error captured".to_string(),
        }))
    }
}

fn retry_delay(error: &ProviderError, attempt: u32) -> Duration {
    if let ProviderError::RateLimited {
        retry_after: Some(secs),
        ..
    } = error
    {
        Duration::from_secs((*secs).min(30))
    } else {
        backoff_delay(attempt)
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let capped_attempt = attempt.min(20);
    let delay_ms = 100_u64.saturating_mul(1_u64 << capped_attempt);
    Duration::from_millis(delay_ms.min(10_000))
}
