//! Error types for the qualitygate domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Configuration errors
//! live with the config crate. None of these ever reach the host: the hook
//! boundary turns every failure into an allow.

use thiserror::Error;

/// Failures of a [`StateStore`](crate::store::StateStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to write '{key}' for session {session}: {reason}")]
    WriteFailed {
        session: String,
        key: String,
        reason: String,
    },

    #[error("Failed to encode '{key}': {reason}")]
    Encode { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_failure_displays_context() {
        let err = StoreError::WriteFailed {
            session: "abc".into(),
            key: "edit-count".into(),
            reason: "disk full".into(),
        };
        assert!(err.to_string().contains("edit-count"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn encode_failure_names_key() {
        let err = StoreError::Encode {
            key: "budget.json".into(),
            reason: "bad float".into(),
        };
        assert_eq!(err.to_string(), "Failed to encode 'budget.json': bad float");
    }
}
