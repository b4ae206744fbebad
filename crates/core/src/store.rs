//! State store trait: session-scoped key/value persistence.
//!
//! Every hook invocation is a fresh process, so all cross-call state lives
//! behind this trait. Stores partition strictly by [`SessionId`]: one session
//! can never observe or mutate another's keys.
//!
//! Backends deal in raw JSON text. [`SessionState`] layers the typed,
//! never-failing read path on top.

use crate::error::StoreError;
use crate::session::SessionId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::warn;

/// The five independently readable entries held per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKey {
    /// Score plus deduction log.
    Budget,
    EditCount,
    StopAttempts,
    PromptCount,
    /// Paths written while containing a matched pattern.
    TaintedFiles,
}

impl StateKey {
    pub const ALL: [StateKey; 5] = [
        StateKey::Budget,
        StateKey::EditCount,
        StateKey::StopAttempts,
        StateKey::PromptCount,
        StateKey::TaintedFiles,
    ];

    /// Name of the entry inside the session's storage location.
    pub fn file_name(self) -> &'static str {
        match self {
            StateKey::Budget => "budget.json",
            StateKey::EditCount => "edit-count",
            StateKey::StopAttempts => "stop-attempts",
            StateKey::PromptCount => "prompt-count",
            StateKey::TaintedFiles => "tainted-files.json",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// The core StateStore trait.
///
/// Implementations: on-disk (one directory per session) and in-memory.
pub trait StateStore: Send + Sync {
    /// The backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Establish the storage location for a session. Idempotent.
    fn init(&self, session: &SessionId) -> Result<(), StoreError>;

    /// Raw stored text for a key, `None` when absent.
    fn read_raw(&self, session: &SessionId, key: StateKey) -> Result<Option<String>, StoreError>;

    /// Replace the stored text for a key. A reader never sees a partial value.
    fn write_raw(&self, session: &SessionId, key: StateKey, value: &str) -> Result<(), StoreError>;

    /// Whether anything has been stored for the session.
    fn exists(&self, session: &SessionId) -> bool;

    /// Drop every entry held for the session.
    fn clear(&self, session: &SessionId) -> Result<(), StoreError>;
}

/// Typed view of one session inside a store.
///
/// Reads never fail: a missing, unreadable or undecodable value is a cache
/// miss and yields the caller's default.
#[derive(Clone, Copy)]
pub struct SessionState<'a> {
    store: &'a dyn StateStore,
    session: &'a SessionId,
}

impl<'a> SessionState<'a> {
    pub fn new(store: &'a dyn StateStore, session: &'a SessionId) -> Self {
        Self { store, session }
    }

    pub fn session(&self) -> &SessionId {
        self.session
    }

    pub fn init(&self) -> Result<(), StoreError> {
        self.store.init(self.session)
    }

    pub fn read<T: DeserializeOwned>(&self, key: StateKey, default: T) -> T {
        let raw = match self.store.read_raw(self.session, key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                warn!(session = %self.session, key = %key, error = %e, "State read failed, using default");
                return default;
            }
        };
        match serde_json::from_str(raw.trim()) {
            Ok(value) => value,
            Err(e) => {
                warn!(session = %self.session, key = %key, error = %e, "Corrupt state entry, using default");
                default
            }
        }
    }

    pub fn write<T: Serialize + ?Sized>(&self, key: StateKey, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.write_raw(self.session, key, &raw)
    }

    /// Read a counter (default 0), add one, persist it and return the new value.
    ///
    /// This is the only read-modify-write in the system. It is not guarded
    /// against concurrent callers on the same session.
    pub fn increment_counter(&self, key: StateKey) -> Result<u64, StoreError> {
        let next = self.read::<u64>(key, 0).saturating_add(1);
        self.write(key, &next)?;
        Ok(next)
    }
}

impl fmt::Debug for SessionState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("store", &self.store.name())
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        entries: Mutex<HashMap<(String, StateKey), String>>,
        fail_reads: bool,
    }

    impl StateStore for MapStore {
        fn name(&self) -> &str {
            "map"
        }

        fn init(&self, _session: &SessionId) -> Result<(), StoreError> {
            Ok(())
        }

        fn read_raw(&self, session: &SessionId, key: StateKey) -> Result<Option<String>, StoreError> {
            if self.fail_reads {
                return Err(StoreError::Storage("unreadable".into()));
            }
            let entries = self.entries.lock().unwrap();
            Ok(entries.get(&(session.as_str().to_string(), key)).cloned())
        }

        fn write_raw(&self, session: &SessionId, key: StateKey, value: &str) -> Result<(), StoreError> {
            self.entries
                .lock()
                .unwrap()
                .insert((session.as_str().to_string(), key), value.to_string());
            Ok(())
        }

        fn exists(&self, session: &SessionId) -> bool {
            self.entries
                .lock()
                .unwrap()
                .keys()
                .any(|(s, _)| s == session.as_str())
        }

        fn clear(&self, session: &SessionId) -> Result<(), StoreError> {
            self.entries
                .lock()
                .unwrap()
                .retain(|(s, _), _| s != session.as_str());
            Ok(())
        }
    }

    #[test]
    fn missing_key_returns_default() {
        let store = MapStore::default();
        let id = SessionId::new("s1");
        let state = SessionState::new(&store, &id);
        assert_eq!(state.read::<u64>(StateKey::EditCount, 0), 0);
    }

    #[test]
    fn corrupt_value_returns_default() {
        let store = MapStore::default();
        let id = SessionId::new("s1");
        store.write_raw(&id, StateKey::EditCount, "not-a-number").unwrap();
        let state = SessionState::new(&store, &id);
        assert_eq!(state.read::<u64>(StateKey::EditCount, 0), 0);
        assert_eq!(state.increment_counter(StateKey::EditCount).unwrap(), 1);
    }

    #[test]
    fn read_error_returns_default() {
        let store = MapStore {
            fail_reads: true,
            ..MapStore::default()
        };
        let id = SessionId::new("s1");
        let state = SessionState::new(&store, &id);
        assert_eq!(state.read::<i64>(StateKey::Budget, 100), 100);
    }

    #[test]
    fn increment_counter_counts_up() {
        let store = MapStore::default();
        let id = SessionId::new("s1");
        let state = SessionState::new(&store, &id);
        assert_eq!(state.increment_counter(StateKey::StopAttempts).unwrap(), 1);
        assert_eq!(state.increment_counter(StateKey::StopAttempts).unwrap(), 2);
        assert_eq!(state.read::<u64>(StateKey::StopAttempts, 0), 2);
        // Counters are independent.
        assert_eq!(state.read::<u64>(StateKey::PromptCount, 0), 0);
    }

    #[test]
    fn counter_with_trailing_newline_parses() {
        let store = MapStore::default();
        let id = SessionId::new("s1");
        store.write_raw(&id, StateKey::PromptCount, "3\n").unwrap();
        let state = SessionState::new(&store, &id);
        assert_eq!(state.increment_counter(StateKey::PromptCount).unwrap(), 4);
    }

    #[test]
    fn sessions_do_not_share_keys() {
        let store = MapStore::default();
        let a = SessionId::new("a");
        let b = SessionId::new("b");
        SessionState::new(&store, &a)
            .increment_counter(StateKey::EditCount)
            .unwrap();
        let b_state = SessionState::new(&store, &b);
        assert_eq!(b_state.read::<u64>(StateKey::EditCount, 0), 0);
    }

    #[test]
    fn key_file_names_are_distinct() {
        let mut names: Vec<_> = StateKey::ALL.iter().map(|k| k.file_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
