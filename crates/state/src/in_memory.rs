//! In-memory backend: useful for testing and dry runs.

use qualitygate_core::error::StoreError;
use qualitygate_core::session::SessionId;
use qualitygate_core::store::{StateKey, StateStore};
use std::collections::HashMap;
use std::sync::RwLock;

type Entries = HashMap<StateKey, String>;

/// A state store that keeps every session in a map.
/// Nothing survives the process.
pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, Entries>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Storage("in-memory store lock poisoned".into())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn init(&self, session: &SessionId) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| Self::poisoned())?;
        sessions.entry(session.clone()).or_default();
        Ok(())
    }

    fn read_raw(&self, session: &SessionId, key: StateKey) -> Result<Option<String>, StoreError> {
        let sessions = self.sessions.read().map_err(|_| Self::poisoned())?;
        Ok(sessions.get(session).and_then(|e| e.get(&key)).cloned())
    }

    fn write_raw(&self, session: &SessionId, key: StateKey, value: &str) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| Self::poisoned())?;
        sessions
            .entry(session.clone())
            .or_default()
            .insert(key, value.to_string());
        Ok(())
    }

    fn exists(&self, session: &SessionId) -> bool {
        self.sessions
            .read()
            .map(|s| s.contains_key(session))
            .unwrap_or(false)
    }

    fn clear(&self, session: &SessionId) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| Self::poisoned())?;
        sessions.remove(session);
        Ok(())
    }
}
