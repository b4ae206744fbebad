//! Lifecycle gates for coding-agent sessions.
//!
//! The host calls one hook per lifecycle event with a JSON payload on stdin
//! and reads a JSON response from stdout. [`codec`] handles the wire format,
//! [`GateEngine`] decides, and [`messages`] holds the text it injects.
//!
//! | Event | Effect |
//! |-------|--------|
//! | session-start | reset state, announce the quality contract |
//! | pre-write | deny banned patterns, warn on soft ones |
//! | post-write | deduct points, rotate questions, track tainted files |
//! | prompt-submit | phase and shortcut-audit nudges on substantive prompts |
//! | stop | block while the budget is overdrawn or a tainted file is dirty |
//! | pre-command | shell command guard |

pub mod codec;
pub mod engine;
pub mod messages;
pub mod safety;

pub use codec::{HookEvent, HookInput, HookResponse, PermissionDecision};
pub use engine::{GateEngine, MAX_STOP_BLOCKS};
pub use safety::{SafetyPolicy, SafetyVerdict};
