//! Hook wire format: decoding host payloads and encoding responses.
//!
//! Decoding never fails: missing or mistyped fields fall back to empty
//! strings and the `"unknown"` session, so a malformed payload still gets a
//! well-formed (permissive) answer.

use qualitygate_core::session::SessionId;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Tools whose input carries file content.
const WRITE_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit", "NotebookEdit"];
/// Tools that only read a file.
const READ_TOOLS: &[&str] = &["Read"];
/// Tools whose input carries a shell command.
const SHELL_TOOLS: &[&str] = &["Bash"];

/// The lifecycle points the host calls us at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    SessionStart,
    PreWrite,
    PostWrite,
    PromptSubmit,
    Stop,
    PreCommand,
    PreRead,
}

impl HookEvent {
    pub const ALL: [HookEvent; 7] = [
        HookEvent::SessionStart,
        HookEvent::PreWrite,
        HookEvent::PostWrite,
        HookEvent::PromptSubmit,
        HookEvent::Stop,
        HookEvent::PreCommand,
        HookEvent::PreRead,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HookEvent::SessionStart => "session-start",
            HookEvent::PreWrite => "pre-write",
            HookEvent::PostWrite => "post-write",
            HookEvent::PromptSubmit => "prompt-submit",
            HookEvent::Stop => "stop",
            HookEvent::PreCommand => "pre-command",
            HookEvent::PreRead => "pre-read",
        }
    }

    /// Work out the event from the host's own `hook_event_name` and tool.
    pub fn infer(input: &HookInput) -> Option<HookEvent> {
        let tool = input.tool_name.as_str();
        match input.hook_event_name.as_str() {
            "SessionStart" => Some(HookEvent::SessionStart),
            "UserPromptSubmit" => Some(HookEvent::PromptSubmit),
            "Stop" => Some(HookEvent::Stop),
            "PreToolUse" if SHELL_TOOLS.contains(&tool) => Some(HookEvent::PreCommand),
            "PreToolUse" if WRITE_TOOLS.contains(&tool) => Some(HookEvent::PreWrite),
            "PreToolUse" if READ_TOOLS.contains(&tool) => Some(HookEvent::PreRead),
            "PostToolUse" if WRITE_TOOLS.contains(&tool) => Some(HookEvent::PostWrite),
            _ => None,
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookEvent::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown hook event '{s}'"))
    }
}

/// Typed view of one host payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInput {
    pub session: SessionId,
    pub hook_event_name: String,
    pub tool_name: String,
    pub file_path: String,
    /// Content written (or about to be written) to `file_path`.
    pub content: String,
    pub command: String,
    pub prompt: String,
    pub cwd: String,
}

impl Default for HookInput {
    fn default() -> Self {
        Self {
            session: SessionId::unknown(),
            hook_event_name: String::new(),
            tool_name: String::new(),
            file_path: String::new(),
            content: String::new(),
            command: String::new(),
            prompt: String::new(),
            cwd: String::new(),
        }
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

impl HookInput {
    /// Decode a raw payload. Anything unparseable becomes the default input.
    pub fn decode(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!(error = %e, "Malformed hook payload, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let tool_input = value.get("tool_input").unwrap_or(&Value::Null);

        let content = str_field(tool_input, "content")
            .or_else(|| str_field(tool_input, "new_string"))
            .or_else(|| {
                let edits = tool_input.get("edits")?.as_array()?;
                let parts: Vec<&str> = edits
                    .iter()
                    .filter_map(|e| e.get("new_string").and_then(Value::as_str))
                    .collect();
                (!parts.is_empty()).then(|| parts.join("\n"))
            })
            .unwrap_or_default();

        Self {
            session: SessionId::new(str_field(value, "session_id").unwrap_or_default()),
            hook_event_name: str_field(value, "hook_event_name").unwrap_or_default(),
            tool_name: str_field(value, "tool_name").unwrap_or_default(),
            file_path: str_field(tool_input, "file_path")
                .or_else(|| str_field(tool_input, "notebook_path"))
                .unwrap_or_default(),
            content,
            command: str_field(tool_input, "command").unwrap_or_default(),
            prompt: str_field(value, "user_prompt")
                .or_else(|| str_field(value, "prompt"))
                .unwrap_or_default(),
            cwd: str_field(value, "cwd").unwrap_or_default(),
        }
    }

    /// `file_path`, anchored at `cwd` when it is relative and a cwd is known.
    pub fn target_path(&self) -> String {
        let path = Path::new(&self.file_path);
        if self.file_path.is_empty() || path.is_absolute() || self.cwd.is_empty() {
            return self.file_path.clone();
        }
        Path::new(&self.cwd).join(path).to_string_lossy().into_owned()
    }
}

/// Verdict on a pending tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Allow,
    Deny,
}

/// What a handler tells the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResponse {
    /// No opinion.
    Empty,
    /// Text injected into the agent's context.
    Message(String),
    /// Allow or deny the pending tool call, optionally with text.
    Permission {
        decision: PermissionDecision,
        message: Option<String>,
    },
    /// Keep the agent from stopping.
    Block { reason: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HookSpecificOutput<'a> {
    hook_event_name: &'static str,
    permission_decision: PermissionDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission_decision_reason: Option<&'a str>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireResponse<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    hook_specific_output: Option<HookSpecificOutput<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl HookResponse {
    pub fn allow() -> Self {
        HookResponse::Permission {
            decision: PermissionDecision::Allow,
            message: None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, HookResponse::Block { .. })
    }

    pub fn is_deny(&self) -> bool {
        matches!(
            self,
            HookResponse::Permission {
                decision: PermissionDecision::Deny,
                ..
            }
        )
    }

    /// The human-readable text carried by the response, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            HookResponse::Empty => None,
            HookResponse::Message(m) => Some(m),
            HookResponse::Permission { message, .. } => message.as_deref(),
            HookResponse::Block { reason } => Some(reason),
        }
    }

    pub fn to_json(&self) -> Value {
        let wire = match self {
            HookResponse::Empty => WireResponse::default(),
            HookResponse::Message(message) => WireResponse {
                system_message: Some(message),
                ..WireResponse::default()
            },
            HookResponse::Permission { decision, message } => WireResponse {
                hook_specific_output: Some(HookSpecificOutput {
                    hook_event_name: "PreToolUse",
                    permission_decision: *decision,
                    permission_decision_reason: match decision {
                        PermissionDecision::Deny => message.as_deref(),
                        PermissionDecision::Allow => None,
                    },
                }),
                system_message: message.as_deref(),
                ..WireResponse::default()
            },
            HookResponse::Block { reason } => WireResponse {
                decision: Some("block"),
                reason: Some(reason),
                ..WireResponse::default()
            },
        };
        serde_json::to_value(wire).unwrap_or_else(|_| Value::Object(Default::default()))
    }

    /// Single-line JSON for the host's stdout.
    pub fn encode(&self) -> String {
        self.to_json().to_string()
    }
}
