//! `qualitygate status`: show a session's state.

use qualitygate_config::GateConfig;
use qualitygate_core::session::{BudgetRecord, INITIAL_SCORE, SessionId};
use qualitygate_core::store::{SessionState, StateKey, StateStore};
use qualitygate_ledger::BudgetLedger;
use qualitygate_state::FileStore;
use serde_json::json;
use std::collections::BTreeSet;

pub fn run(config: &GateConfig, session: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::new(config.state_dir());
    let id = SessionId::new(session);
    let state = SessionState::new(&store, &id);

    let budget: BudgetRecord = BudgetLedger::new(state).current();
    let edits: u64 = state.read(StateKey::EditCount, 0);
    let stops: u64 = state.read(StateKey::StopAttempts, 0);
    let prompts: u64 = state.read(StateKey::PromptCount, 0);
    let tainted: BTreeSet<String> = state.read(StateKey::TaintedFiles, BTreeSet::new());

    if json {
        let value = json!({
            "session": id,
            "exists": store.exists(&id),
            "budget": budget,
            "edit_count": edits,
            "stop_attempts": stops,
            "prompt_count": prompts,
            "tainted_files": tainted,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("🛡️  qualitygate session {id}");
    println!("==================");
    if !store.exists(&id) {
        println!("  ⚠️  No state recorded yet, showing initial values");
    }
    println!("  State dir:     {}", store.session_dir(&id).display());
    println!("  Score:         {}/{INITIAL_SCORE}", budget.score);
    println!("  Deducted:      {}", budget.total_deducted());
    println!("  Edits:         {edits}");
    println!("  Prompts:       {prompts}");
    println!("  Stop attempts: {stops}");

    if !budget.deductions.is_empty() {
        println!("\n  Deductions:");
        for d in &budget.deductions {
            println!("    -{:<3} {} in {} ({})", d.cost, d.pattern, d.file, d.at.format("%H:%M:%S"));
        }
    }

    if !tainted.is_empty() {
        println!("\n  Tainted files:");
        for path in &tainted {
            println!("    {path}");
        }
    }

    if budget.is_exhausted() {
        println!("\n  ❌ Budget exhausted");
    }

    Ok(())
}
