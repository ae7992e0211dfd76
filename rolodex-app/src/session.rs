//! Persisted sign-in flag.
//!
//! The shell publishes `AUTH.LOGIN` (with the user as payload) and
//! `AUTH.LOGOUT`; [`SessionStore::attach`] mirrors them into a small JSON
//! file so the next start knows whether someone was signed in.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rolodex_core::bus::{AUTH, AUTH_LOGIN, AUTH_LOGOUT, Event, EventBus, Payload, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};

const MAX_SESSION_FILE_SIZE: u64 = 1024 * 1024; // 1MB

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Session state backed by a JSON file.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: RwLock<Session>,
}

impl SessionStore {
    /// Open the store at `path`. A missing file means signed out.
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let current = Self::read(&path).await?;
        log::debug!(
            "Session restored from {} (logged in: {})",
            path.display(),
            current.logged_in
        );
        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn current(&self) -> Session {
        self.current.read().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.current.read().await.logged_in
    }

    pub async fn login(&self, user: Option<Value>) -> AppResult<()> {
        self.replace(Session {
            logged_in: true,
            user,
            updated_at: Some(Utc::now()),
        })
        .await?;
        log::info!("Session started");
        Ok(())
    }

    pub async fn logout(&self) -> AppResult<()> {
        self.replace(Session {
            logged_in: false,
            user: None,
            updated_at: Some(Utc::now()),
        })
        .await?;
        log::info!("Session ended");
        Ok(())
    }

    /// Follow `AUTH.*` events on `bus` until the returned binding is dropped.
    ///
    /// Bus handlers run synchronously, so events are handed to a task that
    /// does the file I/O.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> SessionBinding {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let subscription = bus.subscribe(AUTH, move |event| {
            let _ = tx.send(event.clone());
        });

        let store = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let result = match event.topic.as_str() {
                    AUTH_LOGIN => store.login(user_of(event.payload)).await,
                    AUTH_LOGOUT => store.logout().await,
                    _ => Ok(()),
                };
                if let Err(e) = result {
                    log::error!("Failed to persist session ({}): {e}", event.topic);
                }
            }
        });

        SessionBinding {
            _subscription: subscription,
            task,
        }
    }

    async fn replace(&self, session: Session) -> AppResult<()> {
        let mut current = self.current.write().await;
        Self::write(&self.path, &session).await?;
        *current = session;
        Ok(())
    }

    async fn read(path: &Path) -> AppResult<Session> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| AppError::Session(format!("{}: {e}", path.display())))?
        {
            return Ok(Session::default());
        }

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AppError::Session(format!("{}: {e}", path.display())))?;
        if metadata.len() > MAX_SESSION_FILE_SIZE {
            return Err(AppError::Session(format!(
                "{} is too large ({} bytes)",
                path.display(),
                metadata.len()
            )));
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Session(format!("{}: {e}", path.display())))?;
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(session),
            Err(e) => {
                // A damaged flag file only costs a sign-in.
                log::warn!("Ignoring unreadable session file {}: {e}", path.display());
                Ok(Session::default())
            }
        }
    }

    async fn write(path: &Path, session: &Session) -> AppResult<()> {
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| AppError::Session(format!("serialize session: {e}")))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Session(format!("{}: {e}", parent.display())))?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::Session(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::Session(format!("{}: {e}", path.display())))
    }
}

fn user_of(payload: Payload) -> Option<Value> {
    match payload {
        Payload::User(user) | Payload::Json(user) => Some(user),
        Payload::Empty | Payload::Toast(_) => None,
    }
}

/// Keeps a [`SessionStore`] following the bus.
#[derive(Debug)]
pub struct SessionBinding {
    _subscription: Subscription,
    task: JoinHandle<()>,
}

impl SessionBinding {
    /// Stop following the bus after pending events are written.
    pub async fn detach(self) {
        let Self {
            _subscription: subscription,
            task,
        } = self;
        // Dropping the subscription drops the sender and ends the task.
        drop(subscription);
        if let Err(e) = task.await {
            log::error!("Session task failed: {e}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn missing_file_means_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json")).await.unwrap();
        assert!(!store.is_logged_in().await);
    }

    #[tokio::test]
    async fn login_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = SessionStore::open(&path).await.unwrap();
        assert!(store.login(Some(json!({"name": "ada"}))).await.is_ok());

        let reopened = SessionStore::open(&path).await;
        assert!(matches!(&reopened, Ok(s) if s.path() == path));
        let reopened = reopened.unwrap();
        let session = reopened.current().await;
        assert!(session.logged_in);
        assert_eq!(session.user, Some(json!({"name": "ada"})));
        assert!(session.updated_at.is_some());

        assert!(reopened.logout().await.is_ok());
        let again = SessionStore::open(&path).await.unwrap();
        assert!(!again.is_logged_in().await);
    }

    #[tokio::test]
    async fn damaged_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        assert!(std::fs::write(&path, "{not json").is_ok());
        let store = SessionStore::open(&path).await;
        assert!(matches!(&store, Ok(s) if s.current.try_read().is_ok_and(|c| !c.logged_in)));
    }
}
