//! Session persistence.

use crate::error::AuthError;
use crate::types::Session;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Persists the signed-in session between runs
pub trait SessionStore: Send + Sync {
    /// Load the stored session, if any
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the stored value cannot be read.
    fn get(&self) -> Result<Option<Session>, AuthError>;

    /// Replace the stored session
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the session cannot be written.
    fn set(&self, session: &Session) -> Result<(), AuthError>;

    /// Forget the stored session
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the stored value cannot be removed.
    fn clear(&self) -> Result<(), AuthError>;
}

/// Keeps the session for the lifetime of the process only
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl InMemorySessionStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `session`
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    /// Creates an Arc-wrapped empty store
    #[must_use]
    pub fn shared() -> Arc<dyn SessionStore> {
        Arc::new(Self::new())
    }
}

fn poisoned<T>(_: T) -> AuthError {
    AuthError::Store("session lock poisoned".to_string())
}

impl SessionStore for InMemorySessionStore {
    fn get(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.session.lock().map_err(poisoned)?.clone())
    }

    fn set(&self, session: &Session) -> Result<(), AuthError> {
        *self.session.lock().map_err(poisoned)? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.session.lock().map_err(poisoned)? = None;
        Ok(())
    }
}

/// Stores the session as a JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileSessionStore {
    path: PathBuf,
}

impl JsonFileSessionStore {
    /// Store backed by the file at `path` (created on first write)
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File the session lives in
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for JsonFileSessionStore {
    fn get(&self) -> Result<Option<Session>, AuthError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Store(e.to_string())),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| AuthError::Store(format!("{}: {e}", self.path.display())))
    }

    fn set(&self, session: &Session) -> Result<(), AuthError> {
        let json =
            serde_json::to_string_pretty(session).map_err(|e| AuthError::Store(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| AuthError::Store(e.to_string()))?;
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Store(e.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::SkillLevel;

    fn ana() -> Session {
        Session::new("Ana", "ana@x.com", "999", SkillLevel::Beginner).unwrap()
    }

    #[test]
    fn in_memory_store_set_get_clear() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get().unwrap(), None);

        store.set(&ana()).unwrap();
        assert_eq!(store.get().unwrap().unwrap().display_name(), "Ana");

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn json_store_survives_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let session = ana();

        JsonFileSessionStore::new(&path).set(&session).unwrap();
        let reopened = JsonFileSessionStore::new(&path);

        assert_eq!(reopened.get().unwrap(), Some(session));
    }

    #[test]
    fn json_store_missing_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("absent.json"));

        assert_eq!(store.get().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            JsonFileSessionStore::new(&path).get(),
            Err(AuthError::Store(_))
        ));
    }
}
