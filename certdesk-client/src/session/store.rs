//! Encrypted session persistence
//!
//! One encrypted blob per storage key, mirroring the in-memory session.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use super::{CipherError, Session, SessionCipher, SessionContext};

/// Storage key of the current session
pub const SESSION_KEY: &str = "session";

const BLOB_EXTENSION: &str = "blob";

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session blob is corrupt: {0}")]
    Corrupt(#[from] CipherError),

    #[error("Session JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key/value persistence for encrypted blobs
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> std::io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;
    /// Remove every stored key
    fn clear(&self) -> std::io::Result<()>;
}

/// Navigation side effect of [`SessionStore::clear`]
pub trait Navigator: Send + Sync {
    /// Leave the current view for the login entry point
    fn redirect_to_login(&self);
}

/// Navigator that only records the redirect in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_login(&self) {
        tracing::info!("Session cleared, redirecting to login");
    }
}

/// One file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{BLOB_EXTENSION}"))
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(path).map(Some)
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)
    }

    fn clear(&self) -> std::io::Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(BLOB_EXTENSION) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// In-process storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> std::io::Error {
    std::io::Error::other("memory storage lock poisoned")
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        self.entries.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

/// Session persistence bound to the process-wide session
pub struct SessionStore {
    backend: Arc<dyn StorageBackend>,
    cipher: SessionCipher,
    context: SessionContext,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("cipher", &self.cipher)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        cipher: SessionCipher,
        context: SessionContext,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            backend,
            cipher,
            context,
            navigator,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Read a persisted session
    ///
    /// Missing, undecryptable and unparseable blobs all read as an empty session.
    pub fn load(&self, key: &str) -> Session {
        match self.load_checked(key) {
            Ok(session) => session.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable session");
                Session::new()
            }
        }
    }

    /// Read a persisted session, telling "no session" apart from a corrupt one
    pub fn load_checked(&self, key: &str) -> Result<Option<Session>, SessionStoreError> {
        let Some(blob) = self.backend.get(key)? else {
            return Ok(None);
        };
        if blob.trim().is_empty() {
            return Ok(None);
        }
        let json = self.cipher.decrypt(&blob)?;
        let session: Session = serde_json::from_str(&json)?;
        Ok(Some(session))
    }

    /// Encrypt and persist a session; failures are logged, never raised
    pub fn save(&self, key: &str, session: &Session) {
        if let Err(e) = self.try_save(key, session) {
            tracing::error!(key = %key, error = %e, "Error encrypting storage data");
        }
    }

    fn try_save(&self, key: &str, session: &Session) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(session)?;
        let blob = self.cipher.encrypt(&json)?;
        self.backend.set(key, &blob)?;
        tracing::debug!(key = %key, authenticated = session.is_authenticated(), "Session saved");
        Ok(())
    }

    /// Persist the current in-memory session under [`SESSION_KEY`]
    pub fn persist_current(&self) {
        self.save(SESSION_KEY, &self.context.snapshot());
    }

    /// Load [`SESSION_KEY`] into the process-wide session
    pub fn restore(&self) -> Session {
        let session = self.load(SESSION_KEY);
        if session.is_authenticated() {
            tracing::info!("User session loaded");
        } else {
            tracing::info!("No user session found");
        }
        self.context.replace(session.clone());
        session
    }

    /// Wipe storage, reset the session and go to the login entry point
    pub fn clear(&self) {
        if let Err(e) = self.backend.clear() {
            tracing::error!(error = %e, "Failed to clear session storage");
        }
        self.context.reset();
        self.navigator.redirect_to_login();
    }
}
