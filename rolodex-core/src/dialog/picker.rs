//! Company picker with inline create.
//!
//! While editing a contact the user can pick an existing company or create
//! one in a nested dialog. The nested dialog resolves a [`PendingPick`] that
//! the contact editor awaits, so the result arrives typed instead of through
//! a bus round trip.

use rolodex_provider::{PageQuery, RowId, SortDirection};
use serde_json::Value;
use tokio::sync::oneshot;

use super::editor::RecordDialog;
use super::lifecycle::DialogMode;
use super::values::{CompanyForm, ContactForm, RecordForm};
use crate::context::ConsoleContext;
use crate::error::{CoreError, CoreResult};
use crate::types::{Company, CompanyRef};

/// Number of suggestions returned by [`CompanyPicker::search`].
pub const SUGGESTION_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome<T> {
    /// An existing record was chosen.
    Selected(T),
    /// A record was created inline.
    Created(T),
    Cancelled,
}

impl<T> PickOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Selected(value) | Self::Created(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

impl ContactForm {
    /// Take the picked company, if any. Cancelling keeps the current one.
    pub fn apply_pick(&mut self, outcome: PickOutcome<CompanyRef>) {
        if let Some(company) = outcome.into_value() {
            self.company = Some(company);
        }
    }
}

pub struct CompanyPicker {
    ctx: ConsoleContext,
}

impl CompanyPicker {
    pub fn new(ctx: ConsoleContext) -> Self {
        Self { ctx }
    }

    /// Companies whose fields match `term`, by name.
    pub async fn search(&self, term: &str) -> CoreResult<Vec<CompanyRef>> {
        search_companies(&self.ctx, term).await
    }

    pub fn select(&self, company: CompanyRef) -> PickOutcome<CompanyRef> {
        PickOutcome::Selected(company)
    }

    /// Open a nested "New Company" dialog.
    pub fn create_inline(&self) -> (InlineCreate, PendingPick) {
        let (tx, rx) = oneshot::channel();
        let dialog = RecordDialog::open(self.ctx.clone(), DialogMode::New);
        (
            InlineCreate {
                ctx: self.ctx.clone(),
                dialog,
                resolver: Some(tx),
            },
            PendingPick { rx },
        )
    }
}

/// The nested creation dialog. Dropping it resolves the pick as cancelled.
pub struct InlineCreate {
    ctx: ConsoleContext,
    dialog: RecordDialog<CompanyForm>,
    resolver: Option<oneshot::Sender<PickOutcome<CompanyRef>>>,
}

impl InlineCreate {
    pub fn dialog(&self) -> &RecordDialog<CompanyForm> {
        &self.dialog
    }

    /// Save the new company and hand it to the waiting editor.
    ///
    /// A rejected save keeps the dialog open and the pick pending. When the
    /// server only acknowledges the create, the company is looked up by name;
    /// if it cannot be identified the pick resolves as cancelled and `None` is
    /// returned, but the save still counts as done.
    pub async fn submit(&mut self, values: CompanyForm) -> CoreResult<Option<CompanyRef>> {
        let name = values.name.clone();
        let echo = self.dialog.submit(values).await?;

        let created = match created_ref(&echo, &name) {
            Some(created) => Some(created),
            None => self.find_created(&name).await,
        };
        match &created {
            Some(company) => self.resolve(PickOutcome::Created(company.clone())),
            None => self.resolve(PickOutcome::Cancelled),
        }
        Ok(created)
    }

    async fn find_created(&self, name: &str) -> Option<CompanyRef> {
        log::debug!(
            "[{}] Create echoed no id, looking up {name:?}",
            CompanyForm::ENDPOINT
        );
        match search_companies(&self.ctx, name).await {
            Ok(found) => {
                let newest = found
                    .into_iter()
                    .filter(|c| c.name == name)
                    .max_by_key(|c| c.id);
                if newest.is_none() {
                    log::warn!(
                        "[{}] Created company {name:?} not found by search",
                        CompanyForm::ENDPOINT
                    );
                }
                newest
            }
            Err(e) => {
                e.log(&format!(
                    "[{}] Looking up created company failed",
                    CompanyForm::ENDPOINT
                ));
                None
            }
        }
    }

    pub fn cancel(mut self) {
        self.dialog.cancel();
        self.resolve(PickOutcome::Cancelled);
    }

    fn resolve(&mut self, outcome: PickOutcome<CompanyRef>) {
        if let Some(tx) = self.resolver.take() {
            // The editor may have been closed already.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for InlineCreate {
    fn drop(&mut self) {
        self.resolve(PickOutcome::Cancelled);
    }
}

async fn search_companies(ctx: &ConsoleContext, term: &str) -> CoreResult<Vec<CompanyRef>> {
    let query = PageQuery {
        sort_by: "name".to_string(),
        sort_direction: SortDirection::Asc,
        limit: SUGGESTION_LIMIT,
        search: term.to_string(),
        page: 1,
    };
    let page = ctx.client.list(CompanyForm::ENDPOINT, &query).await?;
    page.data
        .into_iter()
        .map(|row| {
            serde_json::from_value::<Company>(row)
                .map(|company| CompanyRef::from(&company))
                .map_err(|e| CoreError::SerializationError(e.to_string()))
        })
        .collect()
}

fn created_ref(echo: &Value, fallback_name: &str) -> Option<CompanyRef> {
    let id = echo.get("id").and_then(Value::as_u64)?;
    let name = echo
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(fallback_name)
        .to_string();
    Some(CompanyRef { id: RowId(id), name })
}

/// The editor's end of an inline create.
#[derive(Debug)]
pub struct PendingPick {
    rx: oneshot::Receiver<PickOutcome<CompanyRef>>,
}

impl PendingPick {
    pub async fn outcome(self) -> PickOutcome<CompanyRef> {
        self.rx.await.unwrap_or(PickOutcome::Cancelled)
    }
}
