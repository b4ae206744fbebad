//! Configuration loading, validation, and management for qualitygate.
//!
//! Loads configuration from `~/.qualitygate/config.toml` (or the file named by
//! `QUALITYGATE_CONFIG`) with environment variable overrides. Everything has a
//! default, so a missing file is not an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.qualitygate/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Where per-session state lives (default: `$TMPDIR/qualitygate`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audit trail configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Shell command guard rules
    #[serde(default)]
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Optional JSONL file every audit entry is appended to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Rules for the shell command guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory names exempt from the mass recursive deletion rule
    #[serde(default = "default_safe_rm_targets")]
    pub safe_rm_targets: Vec<String>,

    /// Commands that are refused outright
    #[serde(default = "default_deny_rules")]
    pub deny: Vec<DenyRuleConfig>,

    /// Commands that pass with a warning
    #[serde(default = "default_warn_commands")]
    pub warn_commands: Vec<WarnCommandConfig>,

    /// File paths that pass with a warning when written
    #[serde(default = "default_warn_files")]
    pub warn_files: Vec<WarnFileConfig>,
}

/// Reason attached to the recursive deletion rule; safe targets apply to it.
pub const MASS_DELETION_REASON: &str = "Mass recursive deletion";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyRuleConfig {
    pub regex: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarnCommandConfig {
    pub regex: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarnFileConfig {
    pub pattern: String,
    pub message: String,
}

fn deny(regex: &str, reason: &str) -> DenyRuleConfig {
    DenyRuleConfig {
        regex: regex.into(),
        reason: reason.into(),
    }
}

fn default_deny_rules() -> Vec<DenyRuleConfig> {
    vec![
        deny(
            r"\brm\s+(-[a-zA-Z]*r[a-zA-Z]*f[a-zA-Z]*|-[a-zA-Z]*f[a-zA-Z]*r[a-zA-Z]*|-r\s+-f|-f\s+-r)\s",
            MASS_DELETION_REASON,
        ),
        deny(r"\bgit\s+push\b.*\s(--force|-f)([^\w-]|$)", "Force push"),
        deny(r"\b(curl|wget)\b[^|]*\|\s*(sudo\s+)?(ba|z)?sh\b", "Piping a remote script into a shell"),
        deny(r"\bmkfs(\.\w+)?\s", "Filesystem formatting"),
        deny(r"\bdd\s+.*\bof=/dev/", "Raw write to a block device"),
        deny(r"\bchmod\s+(-R\s+)?0?777\b", "World-writable permissions"),
    ]
}

fn default_safe_rm_targets() -> Vec<String> {
    ["node_modules", "dist", "build", "target", "coverage", ".next", ".cache"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_warn_commands() -> Vec<WarnCommandConfig> {
    vec![
        WarnCommandConfig {
            regex: r"\bgit\s+reset\s+--hard\b".into(),
            message: "git reset --hard discards uncommitted work".into(),
        },
        WarnCommandConfig {
            regex: r"\b(npm|pnpm|yarn|cargo)\s+publish\b".into(),
            message: "This publishes a package to a public registry".into(),
        },
    ]
}

fn default_warn_files() -> Vec<WarnFileConfig> {
    vec![
        WarnFileConfig {
            pattern: r"(^|/)\.env(\.[\w.-]+)?$".into(),
            message: "Environment files often hold secrets".into(),
        },
        WarnFileConfig {
            pattern: r"(^|/)id_(rsa|ecdsa|ed25519)(\.pub)?$".into(),
            message: "SSH key material".into(),
        },
        WarnFileConfig {
            pattern: r"\.(pem|key|p12)$".into(),
            message: "Certificate or private key material".into(),
        },
    ]
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            safe_rm_targets: default_safe_rm_targets(),
            deny: default_deny_rules(),
            warn_commands: default_warn_commands(),
            warn_files: default_warn_files(),
        }
    }
}

const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl GateConfig {
    /// Load configuration from `QUALITYGATE_CONFIG` or the default path.
    ///
    /// `QUALITYGATE_STATE_DIR` overrides `state_dir`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;

        if let Ok(dir) = std::env::var("QUALITYGATE_STATE_DIR")
            && !dir.trim().is_empty()
        {
            config.state_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".qualitygate")
    }

    /// The config file in use: `QUALITYGATE_CONFIG` if set, else `config.toml`
    /// in [`GateConfig::config_dir`].
    pub fn config_path() -> PathBuf {
        match std::env::var("QUALITYGATE_CONFIG") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => Self::config_dir().join("config.toml"),
        }
    }

    /// Resolved state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("qualitygate"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.level.to_lowercase();
        if !VALID_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}, got '{}'",
                VALID_LEVELS.join(", "),
                self.logging.level
            )));
        }

        if let Some(dir) = &self.state_dir
            && dir.as_os_str().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "state_dir cannot be empty".into(),
            ));
        }

        if self.safety.deny.iter().any(|r| r.reason.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "every safety.deny rule needs a reason".into(),
            ));
        }

        if self.safety.safe_rm_targets.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "safety.safe_rm_targets cannot contain empty names".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
