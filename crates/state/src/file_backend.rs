//! File-based state backend: one directory per session.
//!
//! Layout: `<root>/<sha256(session id)>/<entry>`, where each entry is a small
//! JSON document (`budget.json`, `edit-count`, ...). Hashing the id keeps
//! arbitrary host-supplied ids inside the root and gives every session its
//! own directory.
//!
//! Storage location: `$TMPDIR/qualitygate` unless configured otherwise. The
//! data is ephemeral; nothing here ever deletes old sessions.

use qualitygate_core::error::StoreError;
use qualitygate_core::session::SessionId;
use qualitygate_core::store::{StateKey, StateStore};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory-backed state store.
///
/// Every write lands in a temporary sibling first and is renamed over the
/// target, so readers see either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default root: `$TMPDIR/qualitygate`
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("qualitygate")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one session's entries.
    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(session.storage_key())
    }

    fn entry_path(&self, session: &SessionId, key: StateKey) -> PathBuf {
        self.session_dir(session).join(key.file_name())
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

impl StateStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn init(&self, session: &SessionId) -> Result<(), StoreError> {
        let dir = self.session_dir(session);
        std::fs::create_dir_all(&dir).map_err(|e| {
            StoreError::Storage(format!("Failed to create state directory {}: {e}", dir.display()))
        })?;
        debug!(session = %session, dir = %dir.display(), "Session state directory ready");
        Ok(())
    }

    fn read_raw(&self, session: &SessionId, key: StateKey) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(session, key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn write_raw(&self, session: &SessionId, key: StateKey, value: &str) -> Result<(), StoreError> {
        let write_failed = |reason: String| StoreError::WriteFailed {
            session: session.to_string(),
            key: key.to_string(),
            reason,
        };

        // Hooks may run before session-start ever fired for this id.
        self.init(session)?;

        let path = self.entry_path(session, key);
        let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
        std::fs::write(&tmp, value).map_err(|e| write_failed(e.to_string()))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(write_failed(e.to_string()));
        }
        Ok(())
    }

    fn exists(&self, session: &SessionId) -> bool {
        self.session_dir(session).is_dir()
    }

    fn clear(&self, session: &SessionId) -> Result<(), StoreError> {
        let dir = self.session_dir(session);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(format!(
                "Failed to remove {}: {e}",
                dir.display()
            ))),
        }
    }
}
