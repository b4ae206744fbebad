//! qualitygate CLI: the main entry point.
//!
//! Commands:
//! - `hook`:   Answer one lifecycle hook (JSON on stdin, JSON on stdout)
//! - `scan`:   Run the quality rules over files on disk
//! - `status`: Show a session's budget, counters and tainted files
//! - `reset`:  Reset a session to its initial state
//! - `rules`:  List the rule table
//! - `config`: Show, validate or locate the configuration

use clap::{Parser, Subcommand};
use qualitygate_config::{GateConfig, LogFormat, LoggingConfig};
use qualitygate_gates::HookEvent;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "qualitygate",
    about = "qualitygate: quality enforcement hooks for coding-agent sessions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one hook event read from stdin
    Hook {
        /// session-start, pre-write, post-write, prompt-submit, stop,
        /// pre-command or pre-read. Inferred from the payload when omitted.
        event: Option<HookEvent>,
    },

    /// Scan files for banned and soft patterns (exit 1 on banned)
    Scan {
        #[arg(required = true)]
        files: Vec<String>,

        /// Emit findings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a session's state
    Status {
        #[arg(short, long, env = "QUALITYGATE_SESSION")]
        session: String,

        /// Emit state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reset a session to a full budget and zeroed counters
    Reset {
        #[arg(short, long, env = "QUALITYGATE_SESSION")]
        session: String,
    },

    /// List the quality rules
    Rules,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

fn init_tracing(verbose: bool, logging: &LoggingConfig) {
    // Hook output owns stdout, so logs always go to stderr.
    let default = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = GateConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    init_tracing(cli.verbose, &config.logging);

    match cli.command {
        Commands::Hook { event } => {
            if let Err(e) = &loaded {
                tracing::warn!(error = %e, "Config unusable, hooks run with defaults");
            }
            commands::hook::run(event, &config);
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&loaded?)?,
            ConfigAction::Validate => commands::config_cmd::validate(loaded)?,
            ConfigAction::Path => commands::config_cmd::path(),
        },
        Commands::Scan { files, json } => {
            if commands::scan::run(&files, json)? {
                std::process::exit(1);
            }
        }
        Commands::Status { session, json } => commands::status::run(&loaded?, &session, json)?,
        Commands::Reset { session } => commands::reset::run(&loaded?, &session)?,
        Commands::Rules => commands::rules::run(),
    }

    Ok(())
}
