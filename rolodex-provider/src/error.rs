use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all remote resource operations.
///
/// Each variant carries the `endpoint` that produced it so log lines and
/// toasts can name the collection involved.
///
/// # Retryable Errors
///
/// The following variants represent transient failures that may succeed on retry:
/// - [`NetworkError`](Self::NetworkError): connection refused, DNS failure, 502-504
/// - [`Timeout`](Self::Timeout): request timed out
/// - [`RateLimited`](Self::RateLimited): HTTP 429
///
/// The HTTP client retries these with exponential backoff when configured to.
/// The collection controller itself never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// A transport-level failure (connection refused, reset, gateway error).
    #[error("[{endpoint}] Network error: {detail}")]
    NetworkError { endpoint: String, detail: String },

    /// The request did not complete before the client timeout.
    #[error("[{endpoint}] Request timeout: {detail}")]
    Timeout { endpoint: String, detail: String },

    /// HTTP 429. `retry_after` is taken from the `Retry-After` header when present.
    #[error("[{endpoint}] Rate limited")]
    RateLimited {
        endpoint: String,
        retry_after: Option<u64>,
        raw_message: Option<String>,
    },

    /// The session is missing or expired (HTTP 401 / 419).
    #[error("[{endpoint}] Not authenticated")]
    Unauthenticated {
        endpoint: String,
        raw_message: Option<String>,
    },

    /// HTTP 403.
    #[error("[{endpoint}] Permission denied")]
    PermissionDenied {
        endpoint: String,
        raw_message: Option<String>,
    },

    /// The addressed record does not exist (HTTP 404).
    #[error("[{endpoint}] Record '{id}' not found")]
    RecordNotFound { endpoint: String, id: String },

    /// The server rejected the submitted values (HTTP 422), reported per field.
    #[error("[{endpoint}] Validation failed: {}", summarize_fields(.fields))]
    ValidationFailed {
        endpoint: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    /// The response body could not be decoded.
    #[error("[{endpoint}] Parse error: {detail}")]
    ParseError { endpoint: String, detail: String },

    /// A request body could not be encoded.
    #[error("[{endpoint}] Serialization error: {detail}")]
    SerializationError { endpoint: String, detail: String },

    /// Any other non-success status.
    #[error("[{endpoint}] HTTP {status}: {raw_message}")]
    Unknown {
        endpoint: String,
        status: u16,
        raw_message: String,
    },
}

fn summarize_fields(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// Whether this is expected behavior (user input, missing record, etc.), used for log levels.
    ///
    /// Return `true` means log at `warn`, `false` means `error`.
    /// **Keep in sync when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. }
                | Self::PermissionDenied { .. }
                | Self::RecordNotFound { .. }
                | Self::ValidationFailed { .. }
        )
    }

    /// Whether a retry of the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }

    /// Endpoint that produced the error.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::NetworkError { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::RateLimited { endpoint, .. }
            | Self::Unauthenticated { endpoint, .. }
            | Self::PermissionDenied { endpoint, .. }
            | Self::RecordNotFound { endpoint, .. }
            | Self::ValidationFailed { endpoint, .. }
            | Self::ParseError { endpoint, .. }
            | Self::SerializationError { endpoint, .. }
            | Self::Unknown { endpoint, .. } => endpoint,
        }
    }
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
