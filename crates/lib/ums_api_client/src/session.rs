//! Client-side session: durable storage plus an in-memory mirror that request
//! code reads synchronously.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ClientResult;
use crate::models::User;

/// What the client knows about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub is_authenticated: bool,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User, access_token: String) -> Self {
        Self {
            user: Some(user),
            access_token: Some(access_token),
            is_authenticated: true,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.is_authenticated && self.access_token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Durable home of the session across restarts.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> ClientResult<Option<Session>>;
    fn save(&self, session: &Session) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    session: Mutex<Option<Session>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> ClientResult<Option<Session>> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file storage.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/ums/session.json`, falling back to the working directory.
    pub fn default_location() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("ums").join("session.json"))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> ClientResult<Option<Session>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable session file");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The live session, mirrored into storage on every change.
pub struct SessionContext {
    current: RwLock<Session>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionContext {
    /// Start from whatever `storage` holds.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let initial = match storage.load() {
            Ok(session) => session.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "could not load stored session");
                Session::anonymous()
            }
        };
        Self {
            current: RwLock::new(initial),
            storage,
        }
    }

    pub fn snapshot(&self) -> Session {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> SessionState {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    pub fn user(&self) -> Option<User> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    /// Replace the whole session.
    pub fn set(&self, session: Session) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&session);
        *current = session;
    }

    /// Swap `expected` for a refreshed access token. Returns `false`, leaving
    /// the session untouched, when the session was ended or replaced since
    /// `expected` was read.
    pub fn replace_access_token(&self, expected: &str, token: String) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if !current.is_authenticated || current.access_token.as_deref() != Some(expected) {
            debug!("session changed during refresh, dropping refreshed token");
            return false;
        }
        current.access_token = Some(token);
        self.persist(&current);
        true
    }

    /// Update the cached user after a profile change.
    pub fn set_user(&self, user: User) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.is_authenticated {
            current.user = Some(user);
            self.persist(&current);
        }
    }

    /// Forget everything, in memory and on disk.
    pub fn clear(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Session::anonymous();
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "could not clear stored session");
        }
    }

    fn persist(&self, session: &Session) {
        match self.storage.save(session) {
            Ok(()) => debug!(authenticated = session.is_authenticated, "session saved"),
            Err(e) => warn!(error = %e, "could not persist session"),
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
