//! Record editor state machine.
//!
//! ```text
//! New:   Ready ──submit──▶ Saving ──ok──▶ Closed
//!                  ▲                │
//!                  └─────failed─────┘
//! Edit:  Loading ──record──▶ Ready ──submit──▶ Saving ──ok──▶ Closed
//! ```
//!
//! `cancel` closes from any state. An edit dialog becomes `Ready` once, when
//! its record arrives, and never goes back to `Loading`.

use rolodex_provider::RowId;
use serde_json::Value;

use super::values::RecordForm;
use crate::error::{CoreError, CoreResult, FieldErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    New,
    Edit(RowId),
}

impl DialogMode {
    pub fn record_id(self) -> Option<RowId> {
        match self {
            Self::New => None,
            Self::Edit(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Waiting for the record; no form is built.
    Loading,
    Ready,
    Saving,
    Closed,
}

/// What an editor renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDialogState<F> {
    pub mode: DialogMode,
    pub readiness: Readiness,
    /// `None` until the form may be built.
    pub default_values: Option<F>,
    pub open: bool,
    /// Messages from the last rejected submit.
    pub errors: FieldErrors,
}

/// A validated save, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub endpoint: &'static str,
    pub id: Option<RowId>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogLifecycle<F> {
    state: PendingDialogState<F>,
}

impl<F: RecordForm> DialogLifecycle<F> {
    /// Creation dialog, ready at once with empty values.
    pub fn new_record() -> Self {
        Self {
            state: PendingDialogState {
                mode: DialogMode::New,
                readiness: Readiness::Ready,
                default_values: Some(F::default()),
                open: true,
                errors: FieldErrors::new(),
            },
        }
    }

    /// Edit dialog for `id`, loading until [`record_loaded`](Self::record_loaded).
    pub fn edit_record(id: RowId) -> Self {
        Self {
            state: PendingDialogState {
                mode: DialogMode::Edit(id),
                readiness: Readiness::Loading,
                default_values: None,
                open: true,
                errors: FieldErrors::new(),
            },
        }
    }

    pub fn open(mode: DialogMode) -> Self {
        match mode {
            DialogMode::New => Self::new_record(),
            DialogMode::Edit(id) => Self::edit_record(id),
        }
    }

    pub fn state(&self) -> &PendingDialogState<F> {
        &self.state
    }

    pub fn mode(&self) -> DialogMode {
        self.state.mode
    }

    pub fn readiness(&self) -> Readiness {
        self.state.readiness
    }

    pub fn is_closed(&self) -> bool {
        self.state.readiness == Readiness::Closed
    }

    /// Values to build the form from. `None` while loading.
    pub fn form(&self) -> Option<&F> {
        match self.state.readiness {
            Readiness::Ready | Readiness::Saving => self.state.default_values.as_ref(),
            Readiness::Loading | Readiness::Closed => None,
        }
    }

    pub fn title(&self) -> String {
        match self.state.mode {
            DialogMode::New => format!("New {}", F::NOUN),
            DialogMode::Edit(_) => format!("Edit {}", F::NOUN),
        }
    }

    /// The record fetch finished.
    ///
    /// Returns `Ok(false)` when the dialog was closed in the meantime; the
    /// record is then ignored.
    pub fn record_loaded(&mut self, record: &Value) -> CoreResult<bool> {
        match self.state.readiness {
            Readiness::Loading => {
                let values = F::from_record(record)?;
                self.state.default_values = Some(values);
                self.state.readiness = Readiness::Ready;
                Ok(true)
            }
            Readiness::Closed => Ok(false),
            Readiness::Ready | Readiness::Saving => Err(CoreError::InvalidState(format!(
                "{} record already loaded",
                F::NOUN
            ))),
        }
    }

    /// Validate `values` and move to `Saving`.
    ///
    /// Validation failures keep the dialog `Ready` with per-field messages.
    pub fn begin_save(&mut self, values: F) -> CoreResult<SaveRequest> {
        if self.state.readiness != Readiness::Ready {
            return Err(CoreError::InvalidState(format!(
                "cannot save {} dialog while {:?}",
                F::NOUN,
                self.state.readiness
            )));
        }

        let errors = values.validate();
        if !errors.is_empty() {
            self.state.errors = errors.clone();
            self.state.default_values = Some(values);
            return Err(CoreError::Validation(errors));
        }

        let payload = values.to_payload()?;
        self.state.errors = FieldErrors::new();
        self.state.default_values = Some(values);
        self.state.readiness = Readiness::Saving;
        Ok(SaveRequest {
            endpoint: F::ENDPOINT,
            id: self.state.mode.record_id(),
            payload,
        })
    }

    pub fn save_succeeded(&mut self) -> CoreResult<()> {
        if self.state.readiness != Readiness::Saving {
            return Err(CoreError::InvalidState(format!(
                "{} dialog is not saving",
                F::NOUN
            )));
        }
        self.close();
        Ok(())
    }

    /// Back to `Ready`; server field errors are kept for display.
    pub fn save_failed(&mut self, error: &CoreError) {
        if self.state.readiness == Readiness::Saving {
            self.state.readiness = Readiness::Ready;
            self.state.errors = error.field_errors().unwrap_or_default();
        }
    }

    /// Close without saving. Returns `false` if already closed.
    pub fn cancel(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.close();
        true
    }

    fn close(&mut self) {
        self.state.readiness = Readiness::Closed;
        self.state.open = false;
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::collections::BTreeMap;

    use rolodex_provider::ProviderError;
    use serde_json::json;

    use super::*;
    use crate::dialog::{CompanyForm, ContactForm};

    fn named(name: &str) -> CompanyForm {
        CompanyForm {
            name: name.into(),
            ..CompanyForm::default()
        }
    }

    #[test]
    fn new_dialog_saves_to_closed() {
        let mut dialog: DialogLifecycle<CompanyForm> = DialogLifecycle::new_record();
        assert_eq!(dialog.readiness(), Readiness::Ready);
        assert_eq!(dialog.form(), Some(&CompanyForm::default()));
        assert_eq!(dialog.title(), "New Company");

        let request = dialog.begin_save(named("Acme"));
        assert!(matches!(&request, Ok(r) if r.id.is_none() && r.endpoint == "/companies"));
        assert_eq!(dialog.readiness(), Readiness::Saving);

        assert!(dialog.save_succeeded().is_ok());
        assert_eq!(dialog.readiness(), Readiness::Closed);
        assert!(!dialog.state().open);
        assert!(dialog.form().is_none());
    }

    #[test]
    fn edit_dialog_has_no_form_until_record_arrives() {
        let mut dialog: DialogLifecycle<ContactForm> = DialogLifecycle::edit_record(RowId(9));
        assert_eq!(dialog.readiness(), Readiness::Loading);
        assert!(dialog.form().is_none());
        assert_eq!(dialog.title(), "Edit Contact");
        assert!(matches!(
            dialog.begin_save(ContactForm::default()),
            Err(CoreError::InvalidState(_))
        ));

        let loaded = dialog.record_loaded(&json!({"id": 9, "firstname": "Ada"}));
        assert!(matches!(loaded, Ok(true)));
        assert_eq!(dialog.form().map(|f| f.firstname.as_str()), Some("Ada"));

        // Only once
        assert!(matches!(
            dialog.record_loaded(&json!({"id": 9})),
            Err(CoreError::InvalidState(_))
        ));
        assert_eq!(dialog.form().map(|f| f.firstname.as_str()), Some("Ada"));
    }

    #[test]
    fn record_after_cancel_is_ignored() {
        let mut dialog: DialogLifecycle<ContactForm> = DialogLifecycle::edit_record(RowId(9));
        assert!(dialog.cancel());
        assert!(!dialog.cancel());
        assert!(matches!(
            dialog.record_loaded(&json!({"firstname": "Ada"})),
            Ok(false)
        ));
        assert!(dialog.form().is_none());
        assert!(dialog.is_closed());
    }

    #[test]
    fn validation_failure_stays_ready_with_messages() {
        let mut dialog: DialogLifecycle<ContactForm> = DialogLifecycle::new_record();
        let result = dialog.begin_save(ContactForm::default());
        assert!(matches!(result, Err(CoreError::Validation(_))));
        assert_eq!(dialog.readiness(), Readiness::Ready);
        assert!(!dialog.state().errors.get("firstname").is_empty());
    }

    #[test]
    fn server_rejection_returns_to_ready() {
        let mut dialog: DialogLifecycle<CompanyForm> = DialogLifecycle::edit_record(RowId(3));
        assert!(matches!(dialog.record_loaded(&json!({"name": "Acme"})), Ok(true)));
        assert!(dialog.begin_save(named("Acme Ltd")).is_ok());

        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), vec!["The name has already been taken.".to_string()]);
        let error = CoreError::from(ProviderError::ValidationFailed {
            endpoint: "/companies".into(),
            fields,
        });
        dialog.save_failed(&error);

        assert_eq!(dialog.readiness(), Readiness::Ready);
        assert!(dialog.state().open);
        assert_eq!(dialog.form().map(|f| f.name.as_str()), Some("Acme Ltd"));
        assert_eq!(dialog.state().errors.get("name").len(), 1);
        assert!(dialog.begin_save(named("Acme Holdings")).is_ok());
    }
}
