//! Audit trail: structured records of every gate decision.
//!
//! Records denials, deductions and stop-gate outcomes so a session can be
//! reviewed afterwards. Sinks never influence a hook's response: a sink that
//! fails to record just logs and moves on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub session: String,
    pub event: AuditEvent,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

/// Types of auditable gate events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Session state was re-zeroed.
    SessionReset,
    /// A write was refused before it happened.
    WriteDenied { file: String, patterns: Vec<String> },
    /// A write went through with soft findings.
    WriteWarned { file: String, patterns: Vec<String> },
    /// Points were taken from the budget.
    BudgetDeducted { file: String, cost: u32, score: i64 },
    /// The agent was kept from stopping.
    StopBlocked { attempt: u64 },
    /// The stop gate let the agent go.
    StopReleased { attempt: u64 },
    /// A shell command was refused.
    CommandDenied { reason: String },
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Allowed,
    Warned,
    Denied,
}

/// Trait for audit log sinks (where events are written).
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Audit logger that keeps entries in memory and forwards them to sinks.
pub struct AuditLogger {
    entries: Mutex<Vec<AuditEntry>>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    /// Create a new audit logger with no sinks.
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    /// Create a new audit logger with the given sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sinks,
        }
    }

    /// Record an audit event.
    pub fn log(&self, session: &str, event: AuditEvent, outcome: AuditOutcome, details: Option<String>) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            session: session.into(),
            event,
            outcome,
            details,
        };

        for sink in &self.sinks {
            sink.record(&entry);
        }

        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    /// Get all recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Get entries with the given outcome.
    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| &e.outcome == outcome)
            .collect()
    }

    /// Count of stored entries.
    pub fn count(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

/// A tracing-based audit sink that logs entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(
            session = %entry.session,
            event = ?entry.event,
            outcome = ?entry.outcome,
            details = ?entry.details,
            "AUDIT"
        );
    }
}

/// Appends one JSON object per line to a file.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl AuditSink for JsonlSink {
    fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.append(entry) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to append audit entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn log_and_retrieve_entries() {
        let logger = AuditLogger::new();
        logger.log("s1", AuditEvent::SessionReset, AuditOutcome::Allowed, None);
        logger.log(
            "s1",
            AuditEvent::WriteDenied {
                file: "a.ts".into(),
                patterns: vec!["as any".into()],
            },
            AuditOutcome::Denied,
            Some("critical findings".into()),
        );

        assert_eq!(logger.count(), 2);
        let entries = logger.entries();
        assert_eq!(entries[0].event, AuditEvent::SessionReset);
        assert_eq!(entries[1].outcome, AuditOutcome::Denied);
    }

    #[test]
    fn filter_by_outcome() {
        let logger = AuditLogger::default();
        logger.log("s", AuditEvent::StopBlocked { attempt: 1 }, AuditOutcome::Denied, None);
        logger.log("s", AuditEvent::StopBlocked { attempt: 2 }, AuditOutcome::Denied, None);
        logger.log("s", AuditEvent::StopReleased { attempt: 3 }, AuditOutcome::Allowed, None);

        assert_eq!(logger.entries_by_outcome(&AuditOutcome::Denied).len(), 2);
        assert_eq!(logger.entries_by_outcome(&AuditOutcome::Allowed).len(), 1);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = AuditEvent::BudgetDeducted {
            file: "a.ts".into(),
            cost: 13,
            score: 87,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"budget_deducted""#));
        let back: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn custom_sink_receives_events() {
        struct TestSink {
            received: Arc<Mutex<Vec<String>>>,
        }

        impl AuditSink for TestSink {
            fn record(&self, entry: &AuditEntry) {
                self.received.lock().unwrap().push(entry.session.clone());
            }
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::with_sinks(vec![Box::new(TestSink {
            received: received.clone(),
        })]);
        logger.log("abc", AuditEvent::SessionReset, AuditOutcome::Allowed, None);

        assert_eq!(*received.lock().unwrap(), vec!["abc".to_string()]);
    }

    #[test]
    fn jsonl_sink_appends_lines() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("audit.jsonl");
        let logger = AuditLogger::with_sinks(vec![Box::new(JsonlSink::new(&path))]);

        logger.log("s", AuditEvent::StopBlocked { attempt: 1 }, AuditOutcome::Denied, None);
        logger.log(
            "s",
            AuditEvent::CommandDenied {
                reason: "Mass recursive deletion".into(),
            },
            AuditOutcome::Denied,
            None,
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.event, AuditEvent::StopBlocked { attempt: 1 });
    }

    #[test]
    fn debug_format() {
        let logger = AuditLogger::new();
        let debug_str = format!("{logger:?}");
        assert!(debug_str.contains("entry_count"));
    }
}
