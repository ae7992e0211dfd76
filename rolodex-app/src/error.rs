use std::path::PathBuf;

use rolodex_core::CoreError;
use rolodex_provider::ProviderError;
use thiserror::Error;

/// Bootstrap error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The config file exists but could not be read or parsed.
    #[error("Failed to load config {}: {message}", path.display())]
    ConfigLoad { path: PathBuf, message: String },

    /// A config value is out of range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The session file could not be read or written.
    #[error("Session store error: {0}")]
    Session(String),

    /// A global logger is already installed, or the filter does not parse.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AppError {
    /// `true` means log at `warn`, `false` means `error`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::InvalidConfig(_) => true,
            Self::ConfigLoad { .. } | Self::Session(_) | Self::Logging(_) => false,
            Self::Core(e) => e.is_expected(),
            Self::Provider(e) => e.is_expected(),
        }
    }
}

/// App layer Result type alias
pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn config_load_mentions_path() {
        let err = AppError::ConfigLoad {
            path: PathBuf::from("/etc/rolodex.toml"),
            message: "expected `=`".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load config /etc/rolodex.toml: expected `=`"
        );
        assert!(!err.is_expected());
    }

    #[test]
    fn wrapped_errors_keep_their_level() {
        let err = AppError::from(CoreError::InvalidState("closed".into()));
        assert!(err.is_expected());
        assert!(AppError::InvalidConfig("rows_per_page must be > 0".into()).is_expected());
    }
}
