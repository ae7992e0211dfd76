//! Application bootstrap for the Rolodex admin console.
//!
//! Provides `AppState` (the running console), `AppStateBuilder` (config and
//! transport injection), and `StartupHooks` (shell callbacks during start-up),
//! plus config loading, logging setup and the persisted session flag.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;

use std::path::PathBuf;
use std::sync::Arc;

use rolodex_core::dialog::DialogTracker;
use rolodex_core::screen::{COMPANIES_SCREEN, CONTACTS_SCREEN, spawn_companies, spawn_contacts};
use rolodex_core::{CompaniesScreen, ConsoleContext, ContactsScreen, EventBus};
use rolodex_provider::{HttpResourceClient, ResourceClient};
use tokio::task::JoinHandle;

pub use config::ConsoleConfig;
pub use error::{AppError, AppResult};
pub use logging::init_logging;
pub use session::{Session, SessionBinding, SessionStore};

/// Shell callbacks for the startup sequence.
///
/// Use `NoopStartupHooks` when the shell has nothing to do.
#[async_trait::async_trait]
pub trait StartupHooks: Send + Sync {
    /// Called once the session flag has been read.
    async fn session_restored(&self, _session: &Session) {}

    /// Called when both list screens have finished their first load.
    async fn screens_ready(&self, _companies: u64, _contacts: u64) {}
}

/// No-op startup hooks.
pub struct NoopStartupHooks;

#[async_trait::async_trait]
impl StartupHooks for NoopStartupHooks {}

/// The running console.
///
/// Built once at startup via `AppStateBuilder`. Owns the bus and its
/// dispatcher; everything else shares them through `ctx`.
pub struct AppState {
    pub config: ConsoleConfig,
    /// Transport and bus handed to dialogs and pickers
    pub ctx: ConsoleContext,
    pub companies: CompaniesScreen,
    pub contacts: ContactsScreen,
    /// Number of open dialogs
    pub dialogs: DialogTracker,
    pub session: Arc<SessionStore>,
    session_binding: SessionBinding,
    dispatcher: JoinHandle<()>,
}

impl AppState {
    /// Wait for the first load of both screens and report to `hooks`.
    pub async fn run_startup(&self, hooks: &dyn StartupHooks) -> AppResult<()> {
        hooks.session_restored(&self.session.current().await).await;

        let (companies, contacts) =
            futures::future::try_join(self.companies.settled(), self.contacts.settled()).await?;
        tracing::info!(
            "Console ready: {} companies, {} contacts",
            companies.row_count,
            contacts.row_count
        );
        hooks
            .screens_ready(companies.row_count, contacts.row_count)
            .await;
        Ok(())
    }

    /// Tear down screens and the session binding, then stop the bus.
    pub async fn shutdown(self) {
        let Self {
            ctx,
            companies,
            contacts,
            dialogs,
            session_binding,
            dispatcher,
            ..
        } = self;

        futures::future::join(companies.shutdown(), contacts.shutdown()).await;
        session_binding.detach().await;
        drop(dialogs);

        ctx.bus.shutdown();
        if let Err(e) = dispatcher.await {
            tracing::error!("Bus dispatcher failed: {e}");
        }
        tracing::info!("Console shut down");
    }
}

/// Builder for `AppState`.
///
/// # Optional
/// - `config`: defaults to `ConsoleConfig::default()`
/// - `client`: defaults to an `HttpResourceClient` built from `config.api`
/// - `bus`: defaults to a new `EventBus`
/// - `session_path`: defaults to `config.session.path`
pub struct AppStateBuilder {
    config: Option<ConsoleConfig>,
    client: Option<Arc<dyn ResourceClient>>,
    bus: Option<EventBus>,
    session_path: Option<PathBuf>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            client: None,
            bus: None,
            session_path: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: ConsoleConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn client(mut self, client: Arc<dyn ResourceClient>) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    #[must_use]
    pub fn session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = Some(path.into());
        self
    }

    /// Build the `AppState` and mount both screens.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns `AppError::InvalidConfig` for an invalid config, and
    /// `AppError::Session` if the session file cannot be read.
    pub async fn build(self) -> AppResult<AppState> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let client: Arc<dyn ResourceClient> = match self.client {
            Some(client) => client,
            None => Arc::new(HttpResourceClient::new(
                &config.api.base_url,
                config.api.timeout(),
                config.api.max_retries,
            )?),
        };
        tracing::info!("Using {} transport", client.id());

        let session_path = self
            .session_path
            .unwrap_or_else(|| config.session.path.clone());
        let session = Arc::new(SessionStore::open(session_path).await?);

        let bus = self.bus.unwrap_or_default();
        let dispatcher = bus.spawn_dispatcher();
        let ctx = ConsoleContext::new(client, bus);
        let session_binding = session.attach(&ctx.bus);
        let dialogs = DialogTracker::attach(&ctx.bus);

        let companies = spawn_companies(&ctx, config.grid.settings_for(&COMPANIES_SCREEN));
        let contacts = spawn_contacts(&ctx, config.grid.settings_for(&CONTACTS_SCREEN));

        Ok(AppState {
            config,
            ctx,
            companies,
            contacts,
            dialogs,
            session,
            session_binding,
            dispatcher,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
