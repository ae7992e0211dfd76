//! Rolodex Core Library
//!
//! Controller logic behind the Rolodex admin console's list screens:
//! - Collection controller (search, paging, multi-select, bulk delete)
//! - Create/edit dialog lifecycle with form transforms and validation
//! - Process-wide event bus for refreshes, toasts and dialog chrome
//!
//! The library knows nothing about rendering. A shell drives screens through
//! [`screen::ScreenHandle`] and dialogs through [`dialog::RecordDialog`], and
//! the remote API is reached through [`rolodex_provider::ResourceClient`].

pub mod bus;
pub mod collection;
pub mod context;
pub mod debounce;
pub mod dialog;
pub mod error;
pub mod pagination;
pub mod screen;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use bus::{Event, EventBus, Payload, Subscription, Toast};
pub use context::ConsoleContext;
pub use error::{CoreError, CoreResult, FieldErrors};
pub use screen::{CompaniesScreen, ContactsScreen, ScreenHandle, ScreenSettings};
