//! List screens as tasks.
//!
//! A screen owns its [`CollectionController`] on a dedicated task and is
//! driven through a [`ScreenHandle`]. Fetches run on their own tasks and
//! report back through the same command channel, so input keeps flowing
//! while a request is in flight and the controller stays single-writer.
//!
//! On mount a screen subscribes to its root topic (`COMPANIES`,
//! `CONTACTS`) and reloads on the matching `*.REFRESH` event. The
//! subscription is released when the task ends, which happens on
//! [`ScreenHandle::shutdown`] or once every handle is dropped.

use std::sync::Arc;
use std::time::Duration;

use rolodex_provider::RowId;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::bus::{
    COMPANIES, COMPANIES_REFRESH, CONTACTS, CONTACTS_REFRESH, Subscription, TOAST_SHOW, Toast,
};
use crate::collection::{
    CollectionController, CollectionSource, CollectionViewState, CompletedFetch,
    DeleteConfirmation, FetchOutcome, FetchTicket, RemoteCollection, execute_fetch,
};
use crate::context::ConsoleContext;
use crate::debounce::{DEFAULT_SEARCH_DEBOUNCE, QueryDebouncer, SearchSink};
use crate::error::{CoreError, CoreResult};
use crate::types::{Company, Contact};

/// Static description of a list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenKind {
    pub name: &'static str,
    pub endpoint: &'static str,
    /// Used in delete confirmations ("The following Companies ...").
    pub plural_title: &'static str,
    /// Root topic the screen listens on.
    pub topic: &'static str,
    pub refresh_topic: &'static str,
    pub default_rows_per_page: u32,
}

pub const COMPANIES_SCREEN: ScreenKind = ScreenKind {
    name: "companies",
    endpoint: "/companies",
    plural_title: "Companies",
    topic: COMPANIES,
    refresh_topic: COMPANIES_REFRESH,
    default_rows_per_page: 10,
};

pub const CONTACTS_SCREEN: ScreenKind = ScreenKind {
    name: "contacts",
    endpoint: "/contacts",
    plural_title: "Contacts",
    topic: CONTACTS,
    refresh_topic: CONTACTS_REFRESH,
    default_rows_per_page: 20,
};

/// Tunables for one screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSettings {
    pub rows_per_page: u32,
    pub search_debounce: Duration,
}

impl ScreenSettings {
    pub fn for_kind(kind: &ScreenKind) -> Self {
        Self {
            rows_per_page: kind.default_rows_per_page,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

/// Messages handled by a screen task.
pub enum ScreenCommand<R> {
    /// Raw search box content; debounced before it reaches the controller.
    SearchInput(String),
    SearchSettled(String),
    ChangePage(u32),
    /// Reload the current page and show a "Refreshed" toast.
    Refresh,
    ToggleSelected(RowId),
    SetSelection(Vec<RowId>),
    ClearSelection,
    RequestDelete(oneshot::Sender<DeleteConfirmation>),
    ConfirmDelete(DeleteConfirmation),
    CancelDelete(DeleteConfirmation),
    FetchCompleted(CompletedFetch<R>),
    /// Answered once every earlier command has been handled.
    Ping(oneshot::Sender<()>),
    Shutdown,
}

/// Owner's end of a running screen.
pub struct ScreenHandle<R> {
    kind: ScreenKind,
    tx: mpsc::UnboundedSender<ScreenCommand<R>>,
    state: watch::Receiver<CollectionViewState<R>>,
    task: Option<JoinHandle<()>>,
}

pub type CompaniesScreen = ScreenHandle<Company>;
pub type ContactsScreen = ScreenHandle<Contact>;

/// Mount the Companies screen.
pub fn spawn_companies(ctx: &ConsoleContext, settings: ScreenSettings) -> CompaniesScreen {
    let source = Arc::new(RemoteCollection::new(
        Arc::clone(&ctx.client),
        COMPANIES_SCREEN.endpoint,
    ));
    spawn_screen(ctx, source, COMPANIES_SCREEN, settings)
}

/// Mount the Contacts screen.
pub fn spawn_contacts(ctx: &ConsoleContext, settings: ScreenSettings) -> ContactsScreen {
    let source = Arc::new(RemoteCollection::new(
        Arc::clone(&ctx.client),
        CONTACTS_SCREEN.endpoint,
    ));
    spawn_screen(ctx, source, CONTACTS_SCREEN, settings)
}

/// Mount a screen over any source. The first page is requested at once.
///
/// Must be called inside a tokio runtime.
pub fn spawn_screen<S: CollectionSource>(
    ctx: &ConsoleContext,
    source: Arc<S>,
    kind: ScreenKind,
    settings: ScreenSettings,
) -> ScreenHandle<S::Row> {
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = CollectionController::new(source, kind.plural_title, settings.rows_per_page);
    let (state_tx, state_rx) = watch::channel(controller.state().clone());

    let weak = tx.downgrade();
    let refresh_topic = kind.refresh_topic;
    let subscription = ctx.bus.subscribe(kind.topic, move |event| {
        if event.topic == refresh_topic
            && let Some(tx) = weak.upgrade()
        {
            let _ = tx.send(ScreenCommand::Refresh);
        }
    });

    let weak = tx.downgrade();
    let sink: SearchSink = Arc::new(move |value: String| {
        if let Some(tx) = weak.upgrade() {
            let _ = tx.send(ScreenCommand::SearchSettled(value));
        }
    });

    let actor = ScreenActor {
        kind,
        ctx: ctx.clone(),
        controller,
        rx,
        tx: tx.downgrade(),
        debouncer: QueryDebouncer::new(settings.search_debounce, sink),
        state_tx,
        _subscription: subscription,
    };
    let task = tokio::spawn(actor.run());

    ScreenHandle {
        kind,
        tx,
        state: state_rx,
        task: Some(task),
    }
}

impl<R: Clone> ScreenHandle<R> {
    pub fn kind(&self) -> &ScreenKind {
        &self.kind
    }

    /// Latest published state.
    pub fn state(&self) -> CollectionViewState<R> {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn watch(&self) -> watch::Receiver<CollectionViewState<R>> {
        self.state.clone()
    }

    pub fn search_input(&self, raw_value: impl Into<String>) -> CoreResult<()> {
        self.send(ScreenCommand::SearchInput(raw_value.into()))
    }

    pub fn change_page(&self, page: u32) -> CoreResult<()> {
        self.send(ScreenCommand::ChangePage(page))
    }

    pub fn refresh(&self) -> CoreResult<()> {
        self.send(ScreenCommand::Refresh)
    }

    pub fn toggle_selected(&self, id: RowId) -> CoreResult<()> {
        self.send(ScreenCommand::ToggleSelected(id))
    }

    pub fn set_selection(&self, ids: impl IntoIterator<Item = RowId>) -> CoreResult<()> {
        self.send(ScreenCommand::SetSelection(ids.into_iter().collect()))
    }

    pub fn clear_selection(&self) -> CoreResult<()> {
        self.send(ScreenCommand::ClearSelection)
    }

    /// Confirmation for the checked rows on the current page.
    pub async fn request_delete(&self) -> CoreResult<DeleteConfirmation> {
        let (reply, rx) = oneshot::channel();
        self.send(ScreenCommand::RequestDelete(reply))?;
        rx.await.map_err(|_| self.closed())
    }

    pub fn confirm_delete(&self, confirmation: DeleteConfirmation) -> CoreResult<()> {
        self.send(ScreenCommand::ConfirmDelete(confirmation))
    }

    pub fn cancel_delete(&self, confirmation: DeleteConfirmation) -> CoreResult<()> {
        self.send(ScreenCommand::CancelDelete(confirmation))
    }

    /// Wait for every command sent so far to be handled and for the
    /// resulting fetches to settle.
    ///
    /// A search still inside its debounce window is not waited for.
    pub async fn settled(&self) -> CoreResult<CollectionViewState<R>> {
        let (reply, rx) = oneshot::channel();
        self.send(ScreenCommand::Ping(reply))?;
        rx.await.map_err(|_| self.closed())?;

        let mut state = self.state.clone();
        let settled = state
            .wait_for(|s| !s.loading)
            .await
            .map_err(|_| self.closed())?
            .clone();
        Ok(settled)
    }

    /// Stop the screen and wait for its task to end.
    pub async fn shutdown(mut self) {
        let _ = self.tx.send(ScreenCommand::Shutdown);
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            log::error!("[{}] Screen task failed: {e}", self.kind.name);
        }
    }

    fn send(&self, command: ScreenCommand<R>) -> CoreResult<()> {
        self.tx.send(command).map_err(|_| self.closed())
    }

    fn closed(&self) -> CoreError {
        CoreError::ChannelClosed(format!("{} screen has stopped", self.kind.name))
    }
}

impl<R> std::fmt::Debug for ScreenHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenHandle")
            .field("kind", &self.kind.name)
            .field("running", &self.task.as_ref().is_some_and(|t| !t.is_finished()))
            .finish()
    }
}

struct ScreenActor<S: CollectionSource> {
    kind: ScreenKind,
    ctx: ConsoleContext,
    controller: CollectionController<S>,
    rx: mpsc::UnboundedReceiver<ScreenCommand<S::Row>>,
    // Weak so that dropping every handle ends the task.
    tx: mpsc::WeakUnboundedSender<ScreenCommand<S::Row>>,
    debouncer: QueryDebouncer,
    state_tx: watch::Sender<CollectionViewState<S::Row>>,
    _subscription: Subscription,
}

impl<S: CollectionSource> ScreenActor<S> {
    async fn run(mut self) {
        log::debug!("[{}] Screen mounted", self.kind.name);
        let ticket = self.controller.begin_fetch();
        self.spawn_fetch(ticket);
        self.publish_state();

        while let Some(command) = self.rx.recv().await {
            if !self.handle(command) {
                break;
            }
            self.publish_state();
        }

        self.debouncer.cancel();
        log::debug!("[{}] Screen torn down", self.kind.name);
    }

    /// Returns `false` when the screen should stop.
    fn handle(&mut self, command: ScreenCommand<S::Row>) -> bool {
        match command {
            ScreenCommand::SearchInput(raw) => self.debouncer.on_input(&raw),
            ScreenCommand::SearchSettled(query) => {
                let ticket = self.controller.search(query);
                self.spawn_fetch(ticket);
            }
            ScreenCommand::ChangePage(page) => {
                if let Some(ticket) = self.controller.change_page(page) {
                    self.spawn_fetch(ticket);
                }
            }
            ScreenCommand::Refresh => {
                let ticket = self.controller.refresh();
                self.spawn_fetch(ticket);
                self.ctx.bus.publish(TOAST_SHOW, Toast::new("Refreshed"));
            }
            ScreenCommand::ToggleSelected(id) => self.controller.toggle_selected(id),
            ScreenCommand::SetSelection(ids) => self.controller.set_selection(ids),
            ScreenCommand::ClearSelection => self.controller.clear_selection(),
            ScreenCommand::RequestDelete(reply) => {
                let _ = reply.send(self.controller.request_delete());
            }
            ScreenCommand::ConfirmDelete(confirmation) => {
                if let Some(ticket) = self.controller.confirm_delete(confirmation) {
                    self.spawn_fetch(ticket);
                }
            }
            ScreenCommand::CancelDelete(confirmation) => {
                self.controller.cancel_delete(confirmation);
            }
            ScreenCommand::FetchCompleted(done) => match self.controller.complete(done) {
                FetchOutcome::Refetch(ticket) => self.spawn_fetch(ticket),
                // Failures are logged by the controller and leave the
                // screen usable.
                FetchOutcome::Applied | FetchOutcome::Failed(_) | FetchOutcome::Stale => {}
            },
            ScreenCommand::Ping(reply) => {
                let _ = reply.send(());
            }
            ScreenCommand::Shutdown => return false,
        }
        true
    }

    fn spawn_fetch(&self, ticket: FetchTicket) {
        let source = Arc::clone(self.controller.source());
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let done = execute_fetch(source.as_ref(), ticket).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(ScreenCommand::FetchCompleted(done));
            }
        });
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.controller.state().clone());
    }
}
