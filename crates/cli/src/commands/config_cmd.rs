//! `qualitygate config`: configuration management commands.

use qualitygate_config::{ConfigError, GateConfig};
use qualitygate_gates::SafetyPolicy;

pub fn validate(loaded: Result<GateConfig, ConfigError>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating {}...", GateConfig::config_path().display());

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed successfully");

    let mut warnings = Vec::new();
    if !config.safety.enabled {
        warnings.push("Command guard disabled (safety.enabled = false)".to_string());
    }
    if config.safety.deny.is_empty() {
        warnings.push("No command deny rules configured".to_string());
    }
    let bad_patterns = config
        .safety
        .deny
        .iter()
        .map(|r| r.regex.as_str())
        .chain(config.safety.warn_commands.iter().map(|w| w.regex.as_str()))
        .chain(config.safety.warn_files.iter().map(|w| w.pattern.as_str()))
        .filter(|p| SafetyPolicy::check_pattern(p).is_err())
        .count();
    if bad_patterns > 0 {
        warnings.push(format!("{bad_patterns} safety pattern(s) do not compile and will be skipped"));
    }

    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   State dir:  {}", config.state_dir().display());
    println!("   Log level:  {}", config.logging.level);
    println!("   Audit:      {}", if config.audit.enabled { "enabled" } else { "disabled" });
    println!("   Deny rules: {}", config.safety.deny.len());

    Ok(())
}

pub fn show(config: &GateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path() {
    println!("{}", GateConfig::config_path().display());
}
