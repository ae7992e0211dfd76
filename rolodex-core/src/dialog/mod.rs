//! Create/edit dialogs.
//!
//! [`DialogLifecycle`] is the pure state machine; [`RecordDialog`] drives it
//! against the API and the event bus. Form value transforms live in
//! [`values`] and field checks in [`validation`].

mod editor;
mod lifecycle;
mod picker;
mod tracker;
pub mod validation;
mod values;

pub use editor::{RecordDialog, SaveCallback};
pub use lifecycle::{DialogLifecycle, DialogMode, PendingDialogState, Readiness, SaveRequest};
pub use picker::{CompanyPicker, InlineCreate, PendingPick, PickOutcome, SUGGESTION_LIMIT};
pub use tracker::DialogTracker;
pub use values::{
    AddressForm, CompanyForm, ContactForm, RecordForm, prepare_incoming_values,
    prepare_outgoing_values,
};
