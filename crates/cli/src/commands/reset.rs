//! `qualitygate reset`: put a session back to its initial state.

use qualitygate_config::GateConfig;
use qualitygate_core::session::SessionId;

pub fn run(config: &GateConfig, session: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = super::engine(config);
    let id = SessionId::new(session);
    engine
        .reset_session(&id)
        .map_err(|e| format!("Failed to reset session {id}: {e}"))?;
    println!("✅ Session {id} reset");
    Ok(())
}
