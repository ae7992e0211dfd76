//! Searchable, paginated, deletable views of a remote collection.

mod bulk_delete;
mod controller;
mod source;
mod state;

pub use bulk_delete::{DeleteConfirmation, prepare_delete};
pub use controller::{
    CollectionController, CompletedFetch, FetchOutcome, FetchTicket, execute_fetch,
};
pub use source::{CollectionSource, RemoteCollection};
pub use state::CollectionViewState;
