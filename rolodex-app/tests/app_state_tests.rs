#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for `AppStateBuilder` and the `AppState` lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rolodex_app::{
    AppError, AppStateBuilder, ConsoleConfig, NoopStartupHooks, Session, SessionStore,
    StartupHooks,
};
use rolodex_core::bus::{AUTH_LOGIN, AUTH_LOGOUT, Payload};
use rolodex_core::dialog::{CompanyForm, DialogMode, RecordDialog};
use rolodex_provider::{InMemoryResourceClient, ResourceClient};
use serde_json::json;

async fn seeded_client() -> Arc<InMemoryResourceClient> {
    let client = Arc::new(InMemoryResourceClient::new());
    client
        .seed(
            "/companies",
            (1..=15).map(|id| json!({"id": id, "name": format!("Company {id}")})),
        )
        .await;
    client
        .seed(
            "/contacts",
            (1..=4).map(|id| json!({"id": id, "firstname": format!("Person {id}")})),
        )
        .await;
    client
}

fn builder(client: &Arc<InMemoryResourceClient>, dir: &tempfile::TempDir) -> AppStateBuilder {
    AppStateBuilder::new()
        .client(Arc::clone(client) as Arc<dyn ResourceClient>)
        .session_path(dir.path().join("session.json"))
}

async fn wait_for_login(session: &SessionStore, expected: bool) {
    for _ in 0..200 {
        if session.is_logged_in().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never became logged_in = {expected}");
}

#[derive(Default)]
struct RecordingHooks {
    companies: AtomicU64,
    contacts: AtomicU64,
    restored: AtomicU64,
}

#[async_trait]
impl StartupHooks for RecordingHooks {
    async fn session_restored(&self, _session: &Session) {
        self.restored.fetch_add(1, Ordering::SeqCst);
    }

    async fn screens_ready(&self, companies: u64, contacts: u64) {
        self.companies.store(companies, Ordering::SeqCst);
        self.contacts.store(contacts, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn startup_loads_both_screens() {
    let client = seeded_client().await;
    let dir = tempfile::tempdir().unwrap();
    let state = builder(&client, &dir).build().await.unwrap();

    let hooks = RecordingHooks::default();
    state.run_startup(&hooks).await.unwrap();
    assert_eq!(hooks.restored.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.companies.load(Ordering::SeqCst), 15);
    assert_eq!(hooks.contacts.load(Ordering::SeqCst), 4);

    let companies = state.companies.state();
    assert_eq!(companies.rows_per_page, 10);
    assert_eq!(companies.page_count, 2);
    assert_eq!(state.contacts.state().rows_per_page, 20);

    state.shutdown().await;
}

#[tokio::test]
async fn config_page_sizes_reach_screens() {
    let client = seeded_client().await;
    let dir = tempfile::tempdir().unwrap();
    let config = ConsoleConfig::parse("[grid]\nrows_per_page = 5\n[grid.contacts]\nrows_per_page = 2")
        .unwrap();
    let state = builder(&client, &dir).config(config).build().await.unwrap();
    state.run_startup(&NoopStartupHooks).await.unwrap();

    assert_eq!(state.companies.state().page_count, 3);
    assert_eq!(state.contacts.state().page_count, 2);
    state.shutdown().await;
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let client = seeded_client().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = ConsoleConfig::default();
    config.grid.rows_per_page = Some(0);
    let result = builder(&client, &dir).config(config).build().await;
    assert!(matches!(result, Err(AppError::InvalidConfig(_))));
}

#[tokio::test]
async fn missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConsoleConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, ConsoleConfig::default());

    let path = dir.path().join("rolodex.toml");
    std::fs::write(&path, "[api]\nbase_url = \"https://crm.example.com/api\"\n").unwrap();
    let config = ConsoleConfig::load(&path).unwrap();
    assert_eq!(config.api.base_url, "https://crm.example.com/api");
}

#[tokio::test]
async fn auth_events_are_persisted() {
    let client = seeded_client().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let state = builder(&client, &dir).build().await.unwrap();
    assert!(!state.session.is_logged_in().await);

    state
        .ctx
        .bus
        .publish(AUTH_LOGIN, Payload::User(json!({"email": "ada@example.com"})));
    wait_for_login(&state.session, true).await;
    state.shutdown().await;

    let raw = std::fs::read_to_string(&path).unwrap();
    let stored: Session = serde_json::from_str(&raw).unwrap();
    assert!(stored.logged_in);
    assert_eq!(stored.user, Some(json!({"email": "ada@example.com"})));

    // The next start sees the flag, and logout clears it.
    let state = builder(&client, &dir).build().await.unwrap();
    assert!(state.session.is_logged_in().await);
    state.ctx.bus.publish(AUTH_LOGOUT, Payload::Empty);
    wait_for_login(&state.session, false).await;
    state.shutdown().await;
}

#[tokio::test]
async fn dialog_save_refreshes_companies_screen() {
    let client = seeded_client().await;
    let dir = tempfile::tempdir().unwrap();
    let state = builder(&client, &dir).build().await.unwrap();
    state.run_startup(&NoopStartupHooks).await.unwrap();

    let mut dialog = RecordDialog::<CompanyForm>::open(state.ctx.clone(), DialogMode::New);
    assert!(state.dialogs.any_open());
    dialog
        .submit(CompanyForm {
            name: "Initech".into(),
            ..CompanyForm::default()
        })
        .await
        .unwrap();
    assert!(!state.dialogs.any_open());

    let mut watch = state.companies.watch();
    let companies = watch
        .wait_for(|s| s.row_count == 16 && !s.loading)
        .await
        .unwrap()
        .clone();
    assert_eq!(companies.rows[0].name, "Initech");
    assert_eq!(client.len("/companies").await, 16);
    state.shutdown().await;
}
