//! CLI commands module.

pub mod check;
pub mod resolve;
pub mod validate;

use anyhow::{Context, Result};
use clap::Args;
use gateway_config::{ConfigLoader, GatekeeperConfig, LoggingSettings};
use gateway_telemetry::{init_logging, LogFormat, LogOutput, LoggingConfig};
use llm_gatekeeper::logging_config;
use std::path::Path;

/// Flags accepted by every command.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct GlobalArgs {
    /// Increase output verbosity (-v, -vv, -vvv), overriding the configured level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format; logs are written as JSON too
    #[arg(long, global = true)]
    pub json: bool,
}

/// Load configuration from `path`, or from `GATEKEEPER_CONFIG` when no path
/// is given, plus `GATEKEEPER_*` overrides.
pub(crate) async fn load_config(path: Option<&Path>) -> Result<GatekeeperConfig> {
    match path {
        Some(path) => ConfigLoader::new()
            .with_file(path)
            .load()
            .await
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => gateway_config::load_config()
            .await
            .context("Failed to load configuration"),
    }
}

/// Logging for a command run: the configured section, with `-v` and
/// `--json` taking precedence. Logs go to stderr.
pub(crate) fn command_logging(settings: &LoggingSettings, global: GlobalArgs) -> Result<LoggingConfig> {
    let mut config = logging_config(settings)?;

    let level = match global.verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    };
    if let Some(level) = level {
        config = config.with_level(level);
    }
    if global.json {
        config = config.with_format(LogFormat::Json);
    }

    Ok(config.with_output(LogOutput::Stderr))
}

/// Install logging for this run.
pub(crate) fn init_tracing(settings: &LoggingSettings, global: GlobalArgs) {
    let result = command_logging(settings, global)
        .and_then(|config| init_logging(&config).map_err(Into::into));
    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {e}");
    }
}
