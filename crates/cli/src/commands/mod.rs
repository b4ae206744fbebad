pub mod config_cmd;
pub mod hook;
pub mod reset;
pub mod rules;
pub mod scan;
pub mod status;

use qualitygate_audit::{AuditLogger, AuditSink, JsonlSink, TracingSink};
use qualitygate_config::GateConfig;
use qualitygate_gates::{GateEngine, SafetyPolicy};
use qualitygate_state::FileStore;

/// The engine every command shares: file-backed state under the configured
/// directory, the configured command guard and audit sinks.
pub fn engine(config: &GateConfig) -> GateEngine<FileStore> {
    let mut sinks: Vec<Box<dyn AuditSink>> = Vec::new();
    if config.audit.enabled {
        sinks.push(Box::new(TracingSink));
        if let Some(path) = &config.audit.path {
            sinks.push(Box::new(JsonlSink::new(path)));
        }
    }

    GateEngine::new(FileStore::new(config.state_dir()))
        .with_safety(SafetyPolicy::from_config(&config.safety))
        .with_audit(AuditLogger::with_sinks(sinks))
}
