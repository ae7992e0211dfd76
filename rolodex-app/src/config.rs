//! Console configuration.
//!
//! Read from a TOML file; every key is optional.
//!
//! ```toml
//! [api]
//! base_url = "https://crm.example.com/api"
//! timeout_secs = 30
//! max_retries = 2
//!
//! [grid]
//! rows_per_page = 25
//! search_debounce_ms = 1000
//!
//! [grid.contacts]
//! rows_per_page = 50
//!
//! [log]
//! filter = "info,rolodex_core=debug"
//!
//! [session]
//! path = "session.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rolodex_core::ScreenSettings;
use rolodex_core::debounce::DEFAULT_SEARCH_DEBOUNCE;
use rolodex_core::screen::{COMPANIES_SCREEN, CONTACTS_SCREEN, ScreenKind};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api: ApiConfig,
    pub grid: GridConfig,
    pub log: LogConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Retries for transient failures (network errors, 429, 5xx).
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Applies to every screen without its own value. Unset keeps each
    /// screen's built-in page size.
    pub rows_per_page: Option<u32>,
    pub search_debounce_ms: u64,
    pub companies: ScreenOverride,
    pub contacts: ScreenOverride,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows_per_page: None,
            search_debounce_ms: u64::try_from(DEFAULT_SEARCH_DEBOUNCE.as_millis())
                .unwrap_or(1000),
            companies: ScreenOverride::default(),
            contacts: ScreenOverride::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenOverride {
    pub rows_per_page: Option<u32>,
    pub search_debounce_ms: Option<u64>,
}

impl GridConfig {
    /// Resolved settings for a screen: its override, then the grid-wide
    /// value, then the screen's default.
    pub fn settings_for(&self, kind: &ScreenKind) -> ScreenSettings {
        let screen = self.override_for(kind);
        ScreenSettings {
            rows_per_page: screen
                .and_then(|s| s.rows_per_page)
                .or(self.rows_per_page)
                .unwrap_or(kind.default_rows_per_page),
            search_debounce: Duration::from_millis(
                screen
                    .and_then(|s| s.search_debounce_ms)
                    .unwrap_or(self.search_debounce_ms),
            ),
        }
    }

    fn override_for(&self, kind: &ScreenKind) -> Option<&ScreenOverride> {
        if kind.name == COMPANIES_SCREEN.name {
            Some(&self.companies)
        } else if kind.name == CONTACTS_SCREEN.name {
            Some(&self.contacts)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl ConsoleConfig {
    /// Load `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| AppError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::parse(&raw).map_err(|e| match e {
            AppError::ConfigLoad { message, .. } => AppError::ConfigLoad {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| AppError::ConfigLoad {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        url::Url::parse(&self.api.base_url).map_err(|e| {
            AppError::InvalidConfig(format!("api.base_url {:?}: {e}", self.api.base_url))
        })?;
        if self.api.timeout_secs == 0 {
            return Err(AppError::InvalidConfig(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }

        let page_sizes = [
            ("grid.rows_per_page", self.grid.rows_per_page),
            ("grid.companies.rows_per_page", self.grid.companies.rows_per_page),
            ("grid.contacts.rows_per_page", self.grid.contacts.rows_per_page),
        ];
        for (key, value) in page_sizes {
            if value == Some(0) {
                return Err(AppError::InvalidConfig(format!(
                    "{key} must be greater than 0"
                )));
            }
        }
        Ok(())
    }
}
