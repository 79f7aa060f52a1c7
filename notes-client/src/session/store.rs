//! Process-wide auth session with durable persistence and a hydration handshake.
//!
//! State lives in a `watch` channel: writers go through the store's methods,
//! readers (the API client, the notes query) borrow the current value at the
//! moment they need it or subscribe to changes.
//!
//! Lifecycle: Uninitialized -> `hydrate()` -> Hydrated/Unauthenticated
//! -> `set_token()` -> Hydrated/Authenticated -> `logout()` -> Hydrated/Unauthenticated.

use notes_types::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use super::storage::{SessionStorage, StorageError};
use crate::config::defaults::STORAGE_KEY;

/// Version of the persisted record layout; records with another version are ignored.
const PERSIST_VERSION: u32 = 0;

/// Snapshot of the auth session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    token: Option<String>,
    user: Option<User>,
    is_authenticated: bool,
    has_hydrated: bool,
    /// Advances on every token change so in-flight work can tell the session moved on
    generation: u64,
}

impl SessionState {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn has_hydrated(&self) -> bool {
        self.has_hydrated
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hydrated and authenticated: data fetching and mutations are allowed.
    pub fn is_ready(&self) -> bool {
        self.has_hydrated && self.is_authenticated
    }

    /// Empty tokens are stored as absent so `is_authenticated` tracks presence alone.
    fn apply_token(&mut self, token: Option<String>) {
        let token = token.filter(|t| !t.is_empty());
        if token != self.token {
            self.generation += 1;
        }
        self.is_authenticated = token.is_some();
        self.token = token;
    }
}

/// Route-protection decision for screens that need a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Persisted state has not loaded yet; show a loading placeholder
    Pending,
    Granted,
    RedirectToSignIn,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedAuth {
    token: Option<String>,
    user: Option<User>,
    is_authenticated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedRecord {
    state: PersistedAuth,
    version: u32,
}

pub struct SessionStore {
    state: watch::Sender<SessionState>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        Arc::new(Self { state, storage })
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Current token, read at call time.
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn has_hydrated(&self) -> bool {
        self.state.borrow().has_hydrated
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn route_access(&self) -> RouteAccess {
        let state = self.state.borrow();
        if !state.has_hydrated {
            RouteAccess::Pending
        } else if state.is_authenticated {
            RouteAccess::Granted
        } else {
            RouteAccess::RedirectToSignIn
        }
    }

    /// Resolves once persisted state has been restored.
    pub async fn wait_until_hydrated(&self) {
        let mut rx = self.state.subscribe();
        loop {
            if rx.borrow_and_update().has_hydrated {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Store a token; an empty token leaves the session unauthenticated.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.state.send_modify(|s| s.apply_token(Some(token)));
        log::debug!(
            "[SESSION] Token updated (authenticated: {})",
            self.is_authenticated()
        );
        self.persist();
    }

    /// Store a profile snapshot. Does not change authentication.
    pub fn set_user(&self, user: User) {
        self.state.send_modify(|s| s.user = Some(user));
        self.persist();
    }

    /// Mark persisted state as loaded. One-way: once set it stays set.
    pub fn set_has_hydrated(&self, flag: bool) {
        let changed = self.state.send_if_modified(|s| {
            if flag && !s.has_hydrated {
                s.has_hydrated = true;
                true
            } else {
                false
            }
        });
        if !changed {
            log::debug!("[SESSION] Ignoring set_has_hydrated({})", flag);
        }
    }

    /// Clear token and user in memory and in durable storage.
    pub fn logout(&self) {
        self.state.send_modify(|s| {
            s.apply_token(None);
            s.user = None;
        });
        if let Err(e) = self.storage.remove(STORAGE_KEY) {
            log::warn!("[SESSION] Failed to clear persisted session: {}", e);
        }
        log::info!("[SESSION] Logged out");
    }

    /// Restore persisted state, then mark the store hydrated.
    ///
    /// Unreadable, corrupt or outdated records are treated as an empty session.
    /// A token set before hydration finished wins over the restored one.
    pub fn hydrate(&self) {
        if self.has_hydrated() {
            log::debug!("[SESSION] Already hydrated");
            return;
        }

        // Anything set before hydration has not been written yet
        let set_early = {
            let state = self.state.borrow();
            state.token.is_some() || state.user.is_some()
        };

        if let Some(restored) = self.load_record() {
            self.state.send_modify(|s| {
                if s.token.is_none() {
                    s.apply_token(restored.token);
                    if s.user.is_none() {
                        s.user = restored.user;
                    }
                }
            });
        }

        self.set_has_hydrated(true);
        if set_early {
            self.persist();
        }
        log::info!(
            "[SESSION] Hydrated (authenticated: {})",
            self.is_authenticated()
        );
    }

    fn load_record(&self) -> Option<PersistedAuth> {
        let raw = match self.storage.load(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("[SESSION] Failed to read persisted session: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<PersistedRecord>(&raw) {
            Ok(record) if record.version == PERSIST_VERSION => Some(record.state),
            Ok(record) => {
                log::warn!(
                    "[SESSION] Ignoring persisted session with version {}",
                    record.version
                );
                None
            }
            Err(e) => {
                log::warn!("[SESSION] Ignoring corrupt persisted session: {}", e);
                None
            }
        }
    }

    /// Write the current state. Skipped until hydration so an early write
    /// cannot replace the record before it has been read.
    fn persist(&self) {
        let record = {
            let state = self.state.borrow();
            if !state.has_hydrated {
                log::debug!("[SESSION] Not hydrated yet, deferring persist");
                return;
            }
            PersistedRecord {
                state: PersistedAuth {
                    token: state.token.clone(),
                    user: state.user.clone(),
                    is_authenticated: state.is_authenticated,
                },
                version: PERSIST_VERSION,
            }
        };

        let result = serde_json::to_string(&record)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.save(STORAGE_KEY, &json));
        if let Err(e) = result {
            log::warn!("[SESSION] Failed to persist session: {}", e);
        }
    }
}
