use super::{SessionStore, StoredSession, ACCESS_EXPIRES_AT_KEY, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::ClientError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory key-value session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a session
    pub fn with_session(session: &StoredSession) -> Self {
        let store = Self::new();
        store.lock().extend(
            session
                .entries()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v)),
        );
        store
    }

    /// Raw value of a single key
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Whether no session key is present
    pub fn is_empty(&self) -> bool {
        let entries = self.lock();
        [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, ACCESS_EXPIRES_AT_KEY]
            .iter()
            .all(|k| !entries.contains_key(*k))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<StoredSession>, ClientError> {
        let entries = self.lock();
        Ok(StoredSession::from_entries(|k| entries.get(k).cloned()))
    }

    fn set(&self, session: &StoredSession) -> Result<(), ClientError> {
        let mut entries = self.lock();
        for (key, value) in session.entries() {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        let mut entries = self.lock();
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, ACCESS_EXPIRES_AT_KEY] {
            entries.remove(key);
        }
        Ok(())
    }
}
