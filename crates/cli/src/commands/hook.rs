//! `qualitygate hook`: answer one lifecycle hook.
//!
//! Reads the host payload from stdin and writes exactly one JSON object to
//! stdout. Never fails: anything that goes wrong is logged to stderr and the
//! host gets `{}`.

use qualitygate_config::GateConfig;
use qualitygate_gates::{HookEvent, HookInput, HookResponse};
use std::io::{Read, Write};
use tracing::{debug, warn};

pub fn run(event: Option<HookEvent>, config: &GateConfig) {
    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        warn!(error = %e, "Failed to read hook payload");
    }

    let response = respond(event, &raw, config);

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{}", response.encode()).and_then(|()| stdout.flush()) {
        warn!(error = %e, "Failed to write hook response");
    }
}

/// Decode, dispatch and return the response for one payload.
pub fn respond(event: Option<HookEvent>, raw: &str, config: &GateConfig) -> HookResponse {
    let input = HookInput::decode(raw);
    let Some(event) = event.or_else(|| HookEvent::infer(&input)) else {
        debug!(
            hook_event_name = %input.hook_event_name,
            tool_name = %input.tool_name,
            "No gate for this payload"
        );
        return HookResponse::Empty;
    };

    super::engine(config).dispatch(event, &input)
}
