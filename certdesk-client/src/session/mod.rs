//! Session state
//!
//! The authenticated user record and the process-wide holder every component
//! reads from. The token lives in one canonical field; the legacy key names the
//! backend and older persisted blobs use (`token`, `api_token`, `access_token`)
//! only exist at the serialization boundary.

mod cipher;
mod store;

pub use cipher::{CipherError, SessionCipher};
pub use store::{
    FileStorage, LogNavigator, MemoryStorage, Navigator, SESSION_KEY, SessionStore, SessionStoreError,
    StorageBackend,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

/// Legacy token key names, in lookup priority order
pub const LEGACY_TOKEN_KEYS: [&str; 3] = ["api_token", "access_token", "token"];

/// Authenticated user record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Session {
    auth_token: Option<String>,
    profile: Map<String, Value>,
}

impl Session {
    /// Empty (logged out) session
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for a freshly issued token and user profile
    ///
    /// Token fields inside `profile` are dropped in favor of `token`.
    pub fn authenticated(token: impl Into<String>, profile: Map<String, Value>) -> Self {
        let mut session = Self::from_legacy_map(profile);
        session.auth_token = Some(token.into());
        session
    }

    /// Read a mapping that may carry the token under any legacy name
    ///
    /// The first non-empty string wins and the other string tokens are
    /// folded into it. Values under a legacy name that are not a usable token
    /// (numbers, `null`, `""`) stay in the profile untouched.
    pub fn from_legacy_map(mut map: Map<String, Value>) -> Self {
        let mut auth_token = None;
        let mut kept = Vec::new();
        for key in LEGACY_TOKEN_KEYS {
            match map.remove(key) {
                Some(Value::String(token)) if !token.is_empty() => {
                    if auth_token.is_none() {
                        auth_token = Some(token);
                    }
                }
                Some(other) => kept.push((key.to_string(), other)),
                None => {}
            }
        }
        map.extend(kept);
        Self {
            auth_token,
            profile: map,
        }
    }

    /// Mapping with the token mirrored under every legacy name
    pub fn to_legacy_map(&self) -> Map<String, Value> {
        let mut map = self.profile.clone();
        if let Some(token) = &self.auth_token {
            for key in LEGACY_TOKEN_KEYS {
                map.insert(key.to_string(), Value::String(token.clone()));
            }
        }
        map
    }

    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.auth_token = Some(token.into());
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.auth_token.is_none() && self.profile.is_empty()
    }

    pub fn profile(&self) -> &Map<String, Value> {
        &self.profile
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.profile.get(key)
    }

    /// Display name from the usual profile fields
    pub fn display_name(&self) -> Option<String> {
        let field = |key: &str| self.profile.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());
        match (field("firstName"), field("lastName")) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.to_string()),
            _ => field("email").or_else(|| field("name")).map(str::to_string),
        }
    }
}

impl From<Map<String, Value>> for Session {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_legacy_map(map)
    }
}

impl From<Session> for Map<String, Value> {
    fn from(session: Session) -> Self {
        session.to_legacy_map()
    }
}

/// Process-wide session holder
///
/// Cloning yields another handle to the same session. Readers take snapshots;
/// writers replace or mutate in place (last write wins). Views subscribe to be
/// told about login and logout.
#[derive(Debug, Clone)]
pub struct SessionContext {
    inner: Arc<watch::Sender<Session>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::with_session(Session::new())
    }

    pub fn with_session(session: Session) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self { inner: Arc::new(tx) }
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> Session {
        self.inner.borrow().clone()
    }

    /// Current token, read at call time
    pub fn token(&self) -> Option<String> {
        self.inner.borrow().auth_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.borrow().is_authenticated()
    }

    /// Replace the session, returning the previous one
    pub fn replace(&self, session: Session) -> Session {
        self.inner.send_replace(session)
    }

    /// Mutate the session in place
    pub fn update(&self, f: impl FnOnce(&mut Session)) {
        self.inner.send_modify(f);
    }

    /// Reset to an empty session
    pub fn reset(&self) {
        self.inner.send_replace(Session::new());
    }

    /// Receive every subsequent session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.subscribe()
    }
}
