//! Quality budget ledger.
//!
//! Every session starts with [`INITIAL_SCORE`](qualitygate_core::INITIAL_SCORE) points. Each finding recorded
//! against the session costs its rule's points and appends a [`Deduction`].
//! The ledger is append-only: points are never given back, and the score has
//! no floor. Only a session reset restores it.

use qualitygate_core::error::StoreError;
use qualitygate_core::session::{BudgetRecord, Deduction};
use qualitygate_core::store::{SessionState, StateKey};
use qualitygate_rules::Findings;
use serde::Serialize;
use tracing::warn;

/// What one `apply_findings` call did to the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetChange {
    pub old_score: i64,
    pub new_score: i64,
    pub cost: u32,
    pub findings: Findings,
}

/// Budget view over one session's state.
#[derive(Debug, Clone, Copy)]
pub struct BudgetLedger<'a> {
    state: SessionState<'a>,
}

impl<'a> BudgetLedger<'a> {
    pub fn new(state: SessionState<'a>) -> Self {
        Self { state }
    }

    /// The stored record, or a fresh one if missing or unreadable.
    pub fn current(&self) -> BudgetRecord {
        self.state.read(StateKey::Budget, BudgetRecord::default())
    }

    pub fn score(&self) -> i64 {
        self.current().score
    }

    /// Restore the full score and drop the deduction log.
    pub fn reset(&self) -> Result<(), StoreError> {
        self.state.write(StateKey::Budget, &BudgetRecord::default())
    }

    /// Charge a scan's findings against the budget.
    ///
    /// Returns `None` (and writes nothing) when there are no findings.
    pub fn apply_findings(
        &self,
        findings: &Findings,
        file: &str,
    ) -> Result<Option<BudgetChange>, StoreError> {
        if findings.is_empty() {
            return Ok(None);
        }

        let mut record = self.current();
        let cost = findings.sum_cost();
        let old_score = record.score;
        let new_score = old_score - i64::from(cost);

        record.score = new_score;
        record
            .deductions
            .extend(findings.iter().map(|f| Deduction::new(&f.rule, f.cost, file)));
        self.state.write(StateKey::Budget, &record)?;

        warn!(
            session = %self.state.session(),
            file,
            cost,
            old_score,
            new_score,
            "Quality budget deducted"
        );
        if new_score < 0 && old_score >= 0 {
            warn!(session = %self.state.session(), "Quality budget exhausted");
        }

        Ok(Some(BudgetChange {
            old_score,
            new_score,
            cost,
            findings: findings.clone(),
        }))
    }
}
