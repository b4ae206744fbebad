//! Session identity and the budget record.
//!
//! A session is one continuous interaction between the host and the gate.
//! It has no explicit lifecycle object: its state is whatever the store holds
//! under the session's key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Score every session starts with, and returns to on reset.
pub const INITIAL_SCORE: i64 = 100;

/// Opaque session identifier supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Id used when the host payload carries none.
    pub const UNKNOWN: &'static str = "unknown";

    /// Wrap a host-supplied id. Blank ids collapse to [`SessionId::UNKNOWN`].
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.trim().is_empty() {
            Self::unknown()
        } else {
            Self(id)
        }
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe partition key: lowercase hex SHA-256 of the raw id.
    pub fn storage_key(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A permanently recorded cost applied to a session's score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    /// Rule name that fired.
    pub pattern: String,
    pub cost: u32,
    /// File the offending content was written to.
    pub file: String,
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
}

impl Deduction {
    pub fn new(pattern: impl Into<String>, cost: u32, file: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            cost,
            file: file.into(),
            at: Utc::now(),
        }
    }
}

/// Score plus the append-only deduction log.
///
/// The score has no floor. It only ever moves down within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub score: i64,
    #[serde(default)]
    pub deductions: Vec<Deduction>,
}

impl BudgetRecord {
    pub fn is_exhausted(&self) -> bool {
        self.score < 0
    }

    /// Sum of every recorded cost.
    pub fn total_deducted(&self) -> i64 {
        self.deductions.iter().map(|d| i64::from(d.cost)).sum()
    }
}

impl Default for BudgetRecord {
    fn default() -> Self {
        Self {
            score: INITIAL_SCORE,
            deductions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_session_id_is_unknown() {
        assert_eq!(SessionId::new("").as_str(), "unknown");
        assert_eq!(SessionId::new("   ").as_str(), "unknown");
        assert_eq!(SessionId::new("abc-123").as_str(), "abc-123");
    }

    #[test]
    fn storage_key_is_hex_and_distinct() {
        let a = SessionId::new("a/b");
        let b = SessionId::new("a_b");
        assert_eq!(a.storage_key().len(), 64);
        assert!(a.storage_key().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.storage_key(), b.storage_key());
        assert_eq!(a.storage_key(), SessionId::new("a/b").storage_key());
    }

    #[test]
    fn budget_record_defaults_to_full_score() {
        let record = BudgetRecord::default();
        assert_eq!(record.score, 100);
        assert!(record.deductions.is_empty());
        assert!(!record.is_exhausted());
    }

    #[test]
    fn deduction_without_timestamp_still_decodes() {
        let json = r#"{"pattern":"as any","cost":3,"file":"a.ts"}"#;
        let d: Deduction = serde_json::from_str(json).unwrap();
        assert_eq!(d.pattern, "as any");
        assert_eq!(d.cost, 3);
    }

    #[test]
    fn exhausted_only_below_zero() {
        let zero = BudgetRecord {
            score: 0,
            deductions: vec![],
        };
        assert!(!zero.is_exhausted());
        let negative = BudgetRecord {
            score: -1,
            deductions: vec![Deduction::new("@ts-nocheck", 10, "x.ts")],
        };
        assert!(negative.is_exhausted());
        assert_eq!(negative.total_deducted(), 10);
    }
}
