//! Unified error type definition

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

// Re-export transport error type
pub use rolodex_provider::ProviderError;

/// Per-field validation messages, keyed by form field name.
///
/// Shared by local form validation and `422` responses from the API so a
/// dialog renders both the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for `field`, empty when the field is valid.
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded, otherwise [`CoreError::Validation`].
    pub fn into_result(self) -> CoreResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(self))
        }
    }
}

impl From<BTreeMap<String, Vec<String>>> for FieldErrors {
    fn from(value: BTreeMap<String, Vec<String>>) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Form values rejected, locally or by the server.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// An operation was called in a state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A record could not be converted to or from its wire shape.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The owning screen or bus has shut down.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Transport error
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

impl CoreError {
    /// Whether it is expected behavior (user input, missing record, etc.), used for log levels.
    ///
    /// `true` means log at `warn`, `false` means `error`.
    /// **Keep in sync when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Validation(_) | Self::InvalidState(_) | Self::ChannelClosed(_) => true,
            Self::Provider(e) => e.is_expected(),
            Self::SerializationError(_) => false,
        }
    }

    /// Field errors carried by this error, if it is a validation failure.
    ///
    /// `422` responses are unwrapped too, so callers need only one branch.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::Validation(fields) => Some(fields.clone()),
            Self::Provider(ProviderError::ValidationFailed { fields, .. }) => {
                Some(FieldErrors::from(fields.clone()))
            }
            _ => None,
        }
    }

    /// Log at the level [`is_expected`](Self::is_expected) selects.
    pub fn log(&self, context: &str) {
        if self.is_expected() {
            log::warn!("{context}: {self}");
        } else {
            log::error!("{context}: {self}");
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        assert!(errors.clone().into_result().is_ok());
        errors.add("name", "The name field is required.");
        errors.add("name", "Too short.");
        errors.add("email", "Invalid.");
        assert_eq!(errors.get("name").len(), 2);
        assert!(errors.get("phone").is_empty());
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email", "name"]);
        assert!(matches!(errors.into_result(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn server_validation_exposes_field_errors() {
        let mut fields = BTreeMap::new();
        fields.insert("firstname".to_string(), vec!["required".to_string()]);
        let err = CoreError::from(ProviderError::ValidationFailed {
            endpoint: "/contacts".into(),
            fields,
        });
        assert!(err.is_expected());
        let fields = err.field_errors().unwrap_or_default();
        assert_eq!(fields.get("firstname"), ["required".to_string()]);
    }

    #[test]
    fn network_errors_are_unexpected() {
        let err = CoreError::from(ProviderError::NetworkError {
            endpoint: "/contacts".into(),
            detail: "refused".into(),
        });
        assert!(!err.is_expected());
        assert!(err.field_errors().is_none());
    }
}
