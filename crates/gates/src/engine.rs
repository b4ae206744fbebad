//! The gate engine.
//!
//! One handler per lifecycle event. Handlers never return errors: when the
//! state store fails they log and fall back to the most permissive answer,
//! so a broken state directory can never wedge the agent.

use crate::codec::{HookEvent, HookInput, HookResponse, PermissionDecision};
use crate::messages;
use crate::safety::{SafetyPolicy, SafetyVerdict};
use qualitygate_audit::{AuditEvent, AuditLogger, AuditOutcome};
use qualitygate_core::error::StoreError;
use qualitygate_core::session::{BudgetRecord, SessionId};
use qualitygate_core::store::{SessionState, StateKey, StateStore};
use qualitygate_ledger::BudgetLedger;
use qualitygate_rules::{Findings, RuleTable};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Stop attempts that are evaluated; later ones are always allowed.
pub const MAX_STOP_BLOCKS: u64 = 3;

/// Evaluates hook events against one state store.
pub struct GateEngine<S: StateStore> {
    store: S,
    rules: RuleTable,
    safety: SafetyPolicy,
    audit: AuditLogger,
}

impl<S: StateStore> std::fmt::Debug for GateEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateEngine")
            .field("store", &self.store.name())
            .field("rules", &self.rules.rules().len())
            .field("safety", &self.safety.is_enabled())
            .field("audit", &self.audit)
            .finish()
    }
}

impl<S: StateStore> GateEngine<S> {
    /// An engine with the built-in rules, the default command guard and no
    /// audit sinks.
    pub fn new(store: S) -> Self {
        Self {
            store,
            rules: RuleTable::builtin().clone(),
            safety: SafetyPolicy::default(),
            audit: AuditLogger::new(),
        }
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_safety(mut self, safety: SafetyPolicy) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    fn state<'a>(&'a self, session: &'a SessionId) -> SessionState<'a> {
        SessionState::new(&self.store, session)
    }

    /// Route a decoded payload to its handler.
    pub fn dispatch(&self, event: HookEvent, input: &HookInput) -> HookResponse {
        debug!(%event, session = %input.session, "Dispatching hook");
        match event {
            HookEvent::SessionStart => self.session_start(&input.session),
            HookEvent::PreWrite => self.pre_write(&input.session, &input.target_path(), &input.content),
            HookEvent::PostWrite => self.post_write(&input.session, &input.target_path(), &input.content),
            HookEvent::PromptSubmit => self.prompt_submit(&input.session, &input.prompt),
            HookEvent::Stop => self.stop(&input.session),
            HookEvent::PreCommand => self.pre_command(&input.session, &input.command),
            HookEvent::PreRead => self.pre_read(&input.session, &input.target_path()),
        }
    }

    /// Zero every piece of session state and announce the contract.
    pub fn session_start(&self, session: &SessionId) -> HookResponse {
        if let Err(e) = self.reset_session(session) {
            warn!(%session, error = %e, "Failed to reset session state");
        } else {
            info!(%session, "Session state reset");
        }
        self.audit
            .log(session.as_str(), AuditEvent::SessionReset, AuditOutcome::Allowed, None);
        HookResponse::Message(messages::session_contract(&self.rules))
    }

    /// Drop whatever the session holds and write the initial value of every
    /// state key.
    pub fn reset_session(&self, session: &SessionId) -> Result<(), StoreError> {
        self.store.clear(session)?;
        let state = self.state(session);
        state.init()?;
        BudgetLedger::new(state).reset()?;
        for key in [StateKey::EditCount, StateKey::StopAttempts, StateKey::PromptCount] {
            state.write(key, &0u64)?;
        }
        state.write(StateKey::TaintedFiles, &BTreeSet::<String>::new())
    }

    /// Vet content before it is written. Touches no session state.
    pub fn pre_write(&self, session: &SessionId, file_path: &str, content: &str) -> HookResponse {
        let findings = self.rules.scan(content, file_path);

        if findings.has_critical() {
            let names: Vec<String> = findings.critical().map(|f| f.rule.clone()).collect();
            warn!(%session, file = file_path, patterns = ?names, "Write denied");
            self.audit.log(
                session.as_str(),
                AuditEvent::WriteDenied {
                    file: file_path.to_string(),
                    patterns: names,
                },
                AuditOutcome::Denied,
                None,
            );
            return HookResponse::Permission {
                decision: PermissionDecision::Deny,
                message: Some(messages::deny_write(file_path, findings.critical())),
            };
        }

        let mut parts = Vec::new();
        if !findings.is_empty() {
            self.audit.log(
                session.as_str(),
                AuditEvent::WriteWarned {
                    file: file_path.to_string(),
                    patterns: findings.names().into_iter().map(String::from).collect(),
                },
                AuditOutcome::Warned,
                None,
            );
            parts.push(messages::warn_write(file_path, &findings));
        }
        if let SafetyVerdict::Warn(message) = self.safety.check_file(file_path) {
            parts.push(format!("WARNING: {message}"));
        }

        if parts.is_empty() {
            HookResponse::allow()
        } else {
            HookResponse::Permission {
                decision: PermissionDecision::Allow,
                message: Some(parts.join(messages::SEPARATOR)),
            }
        }
    }

    /// Account for a completed write.
    pub fn post_write(&self, session: &SessionId, file_path: &str, content: &str) -> HookResponse {
        let state = self.state(session);
        let mut parts: Vec<String> = Vec::new();

        match state.increment_counter(StateKey::EditCount) {
            Ok(count) if count % messages::ROTATION_INTERVAL == 0 => {
                parts.push(messages::quality_question(count).to_string());
            }
            Ok(_) => {}
            Err(e) => warn!(%session, error = %e, "Failed to count edit"),
        }

        let findings = self.rules.scan(content, file_path);
        let mut deducted = 0;
        match BudgetLedger::new(state).apply_findings(&findings, file_path) {
            Ok(Some(change)) => {
                deducted = change.cost;
                self.audit.log(
                    session.as_str(),
                    AuditEvent::BudgetDeducted {
                        file: file_path.to_string(),
                        cost: change.cost,
                        score: change.new_score,
                    },
                    AuditOutcome::Warned,
                    None,
                );
                parts.push(messages::budget_alert(file_path, &change));
            }
            Ok(None) => {}
            Err(e) => warn!(%session, file = file_path, error = %e, "Failed to record deduction"),
        }

        if content.chars().count() > messages::CALIBRATION_LENGTH && deducted > messages::CALIBRATION_COST {
            parts.push(messages::SELF_CALIBRATION.to_string());
        }

        if let Some(text) = messages::consequences(&findings) {
            parts.push(text);
        }

        if !findings.is_empty()
            && let Err(e) = self.taint(state, file_path)
        {
            warn!(%session, file = file_path, error = %e, "Failed to record tainted file");
        }

        if parts.is_empty() {
            HookResponse::Empty
        } else {
            HookResponse::Message(parts.join(messages::SEPARATOR))
        }
    }

    fn taint(&self, state: SessionState<'_>, file_path: &str) -> Result<(), StoreError> {
        let mut tainted: BTreeSet<String> = state.read(StateKey::TaintedFiles, BTreeSet::new());
        if tainted.insert(file_path.to_string()) {
            state.write(StateKey::TaintedFiles, &tainted)?;
            debug!(session = %state.session(), file = file_path, "File tainted");
        }
        Ok(())
    }

    /// Steer the agent on substantive prompts.
    pub fn prompt_submit(&self, session: &SessionId, prompt: &str) -> HookResponse {
        let count = match self.state(session).increment_counter(StateKey::PromptCount) {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(%session, error = %e, "Failed to count prompt");
                None
            }
        };

        if messages::word_count(prompt) < messages::MIN_PROMPT_WORDS {
            return HookResponse::Empty;
        }

        let mut parts = Vec::new();
        if count == Some(messages::NEW_PHASE_PROMPT) {
            parts.push(messages::NEW_PHASE);
        }
        if messages::contains_coding_verb(prompt) {
            parts.push(messages::REVELATION_AUDIT);
        }

        if parts.is_empty() {
            HookResponse::Empty
        } else {
            HookResponse::Message(parts.join(messages::SEPARATOR))
        }
    }

    /// Decide whether the agent may stop.
    pub fn stop(&self, session: &SessionId) -> HookResponse {
        let state = self.state(session);
        let attempt = match state.increment_counter(StateKey::StopAttempts) {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!(%session, error = %e, "Failed to count stop attempt, allowing stop");
                return HookResponse::Empty;
            }
        };

        if attempt > MAX_STOP_BLOCKS {
            info!(%session, attempt, "Stop gate released after repeated attempts");
            self.audit.log(
                session.as_str(),
                AuditEvent::StopReleased { attempt },
                AuditOutcome::Allowed,
                Some("attempt limit reached".into()),
            );
            return HookResponse::Empty;
        }

        let mut sections = Vec::new();

        let record: BudgetRecord = BudgetLedger::new(state).current();
        if record.is_exhausted() {
            sections.push(messages::budget_exhausted(&record));
        }

        let failures = self.taint_audit(state);
        if !failures.is_empty() {
            sections.push(messages::taint_audit_failed(&failures));
        }

        if sections.is_empty() {
            self.audit.log(
                session.as_str(),
                AuditEvent::StopReleased { attempt },
                AuditOutcome::Allowed,
                None,
            );
            return HookResponse::Empty;
        }

        warn!(%session, attempt, score = record.score, tainted = failures.len(), "Stop blocked");
        self.audit.log(
            session.as_str(),
            AuditEvent::StopBlocked { attempt },
            AuditOutcome::Denied,
            None,
        );
        HookResponse::Block {
            reason: sections.join(messages::SEPARATOR),
        }
    }

    /// Re-scan every tainted file that still exists for critical patterns.
    ///
    /// Results are sorted by path.
    pub fn taint_audit(&self, state: SessionState<'_>) -> Vec<(String, Findings)> {
        let tainted: BTreeSet<String> = state.read(StateKey::TaintedFiles, BTreeSet::new());
        tainted
            .into_iter()
            .filter_map(|path| {
                let bytes = match std::fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        debug!(path = %path, error = %e, "Tainted file not readable, skipping");
                        return None;
                    }
                };
                let findings = self.rules.scan_critical(&String::from_utf8_lossy(&bytes));
                (!findings.is_empty()).then_some((path, findings))
            })
            .collect()
    }

    /// Flag sensitive files before they are read. Never decides permission.
    pub fn pre_read(&self, session: &SessionId, file_path: &str) -> HookResponse {
        match self.safety.check_file(file_path) {
            SafetyVerdict::Warn(message) => {
                debug!(%session, file = file_path, "Sensitive file read");
                HookResponse::Message(format!("WARNING: {message}"))
            }
            SafetyVerdict::Allow | SafetyVerdict::Deny(_) => HookResponse::Empty,
        }
    }

    /// Vet a shell command before it runs.
    ///
    /// Warnings carry context only, leaving the decision to the host's own
    /// permission rules.
    pub fn pre_command(&self, session: &SessionId, command: &str) -> HookResponse {
        match self.safety.check_command(command) {
            SafetyVerdict::Allow => HookResponse::Empty,
            SafetyVerdict::Warn(message) => HookResponse::Message(format!("WARNING: {message}")),
            SafetyVerdict::Deny(reason) => {
                warn!(%session, command, reason = %reason, "Command denied");
                self.audit.log(
                    session.as_str(),
                    AuditEvent::CommandDenied { reason: reason.clone() },
                    AuditOutcome::Denied,
                    None,
                );
                HookResponse::Permission {
                    decision: PermissionDecision::Deny,
                    message: Some(format!("BLOCKED: {reason}")),
                }
            }
        }
    }
}
