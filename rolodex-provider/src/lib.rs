//! # rolodex-provider
//!
//! Transport layer for the Rolodex admin console: paged REST collections
//! (`/contacts`, `/companies`, ...) behind one object-safe trait.
//!
//! ## Clients
//!
//! | Client | Backing | Use |
//! |--------|---------|-----|
//! | [`HttpResourceClient`] | reqwest | the real console API |
//! | [`InMemoryResourceClient`] | `BTreeMap` per endpoint | tests and offline demos |
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)*: Use the platform's native TLS implementation.
//! - **`rustls`**: Use rustls instead.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rolodex_provider::{HttpResourceClient, PageQuery, ResourceClient, DEFAULT_TIMEOUT};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpResourceClient::new("http://localhost:8000/api", DEFAULT_TIMEOUT, 2)?;
//!
//!     let page = client.list("/contacts", &PageQuery::default()).await?;
//!     println!("page {} of {} ({} rows)", page.current_page, page.last_page, page.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`Result<T>`] with [`ProviderError`]. Use
//! [`ProviderError::is_expected`] to choose a log level and
//! [`ProviderError::is_retryable`] to spot transient failures.

mod error;
mod http_client;
mod memory;
mod rest;
mod traits;
mod types;
mod utils;

pub use error::{ProviderError, Result};
pub use memory::{InMemoryResourceClient, RecordedCall};
pub use rest::{DEFAULT_TIMEOUT, HttpResourceClient};
pub use traits::ResourceClient;
pub use types::{PageQuery, PageResponse, RowId, SortDirection, join_ids};
pub use utils::log_sanitizer::truncate_for_log;
