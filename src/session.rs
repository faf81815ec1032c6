//! Session state: persisted credential, logout transition, navigation
//!
//! The logged-in user is stored as a JSON blob under a well-known key in a
//! [`CredentialStore`]. [`Session`] reads the bearer token from it on every
//! request and clears it on logout. Logout observers and the [`Navigator`]
//! stand in for the application's global store and router.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

/// Logged-in user as persisted by the login flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl StoredUser {
    pub fn new(id: i64, username: impl Into<String>, token: impl Into<String>) -> Self {
        StoredUser {
            id: Some(id),
            username: Some(username.into()),
            token: Some(token.into()),
            roles: Vec::new(),
        }
    }
}

/// Persistent client-side key/value storage
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object file on disk
///
/// The file is rewritten on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            HashMap::new()
        };

        Ok(FileStore {
            path,
            values: RwLock::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

/// Application navigation context
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn redirect(&self, path: &str);
}

/// Navigator that only records where it was sent
#[derive(Debug)]
pub struct MemoryNavigator {
    current: RwLock<String>,
    redirects: RwLock<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        MemoryNavigator {
            current: RwLock::new(start.into()),
            redirects: RwLock::new(Vec::new()),
        }
    }

    /// Every redirect issued so far, oldest first
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn redirect(&self, path: &str) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = path.to_string();
        self.redirects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
    }
}

/// Notified after the session is cleared
pub trait LogoutObserver: Send + Sync {
    fn on_logout(&self);
}

impl<F> LogoutObserver for F
where
    F: Fn() + Send + Sync,
{
    fn on_logout(&self) {
        self()
    }
}

/// Session context shared by the client and the services
pub struct Session {
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    key: String,
    observers: RwLock<Vec<Arc<dyn LogoutObserver>>>,
}

impl Session {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        key: impl Into<String>,
    ) -> Self {
        Session {
            store,
            navigator,
            key: key.into(),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// In-memory session with a navigator parked at `/`
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryNavigator::default()),
            "user",
        )
    }

    /// Persist `user` as the current session
    pub fn login(&self, user: &StoredUser) -> Result<()> {
        let blob = serde_json::to_string(user)?;
        self.store.set(&self.key, blob)?;
        info!("session started for user id={:?}", user.id);
        Ok(())
    }

    /// Decode the stored user; malformed data reads as no user
    pub fn current_user(&self) -> Option<StoredUser> {
        let raw = self.store.get(&self.key)?;
        match serde_json::from_str::<StoredUser>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                error!("failed to parse stored user data: {}", e);
                None
            }
        }
    }

    /// Bearer token of the current user, if any
    pub fn token(&self) -> Option<String> {
        self.current_user()
            .and_then(|user| user.token)
            .filter(|token| !token.is_empty())
    }

    pub fn user_id(&self) -> Option<i64> {
        self.current_user().and_then(|user| user.id)
    }

    /// The current user's id, or `NotAuthenticated`
    pub fn require_user_id(&self) -> Result<i64> {
        self.user_id().ok_or_else(|| {
            ClientError::NotAuthenticated(crate::error::MSG_NOT_AUTHENTICATED.to_string())
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Clear the credential and notify observers
    pub fn logout(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            error!("failed to clear stored credential: {}", e);
        }
        let observers = self
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for observer in observers {
            observer.on_logout();
        }
        info!("session cleared");
    }

    pub fn subscribe(&self, observer: Arc<dyn LogoutObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    /// Send the user to `login_view` unless already there
    pub fn redirect_to_login(&self, login_view: &str) {
        if self.navigator.current_path() != login_view {
            debug!("redirecting to {}", login_view);
            self.navigator.redirect(login_view);
        }
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }
}
