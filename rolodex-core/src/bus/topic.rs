//! Well-known topics and payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TOAST_SHOW: &str = "TOAST.SHOW";

pub const DIALOG: &str = "DIALOG";
pub const DIALOG_OPEN: &str = "DIALOG.OPEN";
pub const DIALOG_CLOSE: &str = "DIALOG.CLOSE";

pub const AUTH: &str = "AUTH";
pub const AUTH_LOGIN: &str = "AUTH.LOGIN";
pub const AUTH_LOGOUT: &str = "AUTH.LOGOUT";

pub const COMPANIES: &str = "COMPANIES";
pub const COMPANIES_REFRESH: &str = "COMPANIES.REFRESH";

pub const CONTACTS: &str = "CONTACTS";
pub const CONTACTS_REFRESH: &str = "CONTACTS.REFRESH";

/// Whether `topic` falls under `prefix`.
///
/// Matching is per dot-separated segment: `CONTACTS` matches `CONTACTS` and
/// `CONTACTS.REFRESH` but not `CONTACTSX`.
pub fn topic_matches(prefix: &str, topic: &str) -> bool {
    match topic.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.') || prefix.is_empty(),
        None => false,
    }
}

/// `TOAST.SHOW` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub message: String,
    #[serde(default)]
    pub auto_hide: bool,
}

impl Toast {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            auto_hide: false,
        }
    }

    #[must_use]
    pub fn auto_hide(mut self) -> Self {
        self.auto_hide = true;
        self
    }
}

/// Data attached to a published event.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Empty,
    Toast(Toast),
    /// `AUTH.LOGIN` user info.
    User(Value),
    Json(Value),
}

impl From<Toast> for Payload {
    fn from(value: Toast) -> Self {
        Self::Toast(value)
    }
}

/// One delivered event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub topic: String,
    pub payload: Payload,
}
