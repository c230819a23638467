//! Validate command - validate configuration files.

use anyhow::{bail, Result};
use clap::Args;
use gateway_config::{ConfigLoader, GatekeeperConfig, LoggingSettings, StoreBackend};
use gateway_routing::ModelMapping;
use serde::Serialize;
use std::path::PathBuf;

use super::GlobalArgs;
use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file to validate
    #[arg(short, long, env = "GATEKEEPER_CONFIG", default_value = "gatekeeper.toml")]
    pub config: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Validation result.
#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub file: String,
    pub warnings: Vec<ValidationMessage>,
    pub errors: Vec<ValidationMessage>,
}

/// Validation message.
#[derive(Debug, Serialize)]
pub struct ValidationMessage {
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ValidationResult {
    fn new(file: String) -> Self {
        Self {
            valid: true,
            file,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>, path: Option<&str>) {
        self.valid = false;
        self.errors.push(ValidationMessage {
            level: "error".to_string(),
            message: message.into(),
            path: path.map(str::to_string),
        });
    }

    fn warning(&mut self, message: impl Into<String>, path: Option<&str>) {
        self.warnings.push(ValidationMessage {
            level: "warning".to_string(),
            message: message.into(),
            path: path.map(str::to_string),
        });
    }
}

/// Execute the validate command.
pub async fn execute(args: ValidateArgs, global: GlobalArgs) -> Result<()> {
    let format = OutputFormat::from_json_flag(global.json);
    let mut result = ValidationResult::new(args.config.display().to_string());

    let loaded = if args.config.exists() {
        match ConfigLoader::new().with_file(&args.config).load().await {
            Ok(config) => Some(config),
            Err(e) => {
                result.error(e.to_string(), None);
                None
            }
        }
    } else {
        result.error(format!("File not found: {}", args.config.display()), None);
        None
    };

    match &loaded {
        Some(config) => {
            super::init_tracing(&config.logging, global);
            validate_config(config, &mut result);
        }
        None => super::init_tracing(&LoggingSettings::default(), global),
    }

    if args.strict && !result.warnings.is_empty() {
        result.valid = false;
    }

    print_result(&result, format)?;
    if !result.valid {
        bail!("Configuration is invalid: {}", result.file);
    }
    Ok(())
}

/// Checks beyond schema validation.
fn validate_config(config: &GatekeeperConfig, result: &mut ValidationResult) {
    match ModelMapping::parse(&config.model_mapping) {
        Ok(mapping) => {
            for model in mapping.cyclic_sources() {
                result.error(
                    format!("Model '{model}' is part of or leads into a mapping cycle"),
                    Some("model_mapping"),
                );
            }
        }
        Err(e) => result.error(e.to_string(), Some("model_mapping")),
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.enabled {
        if rate_limit.requested > rate_limit.capacity {
            result.warning(
                format!(
                    "requested ({}) exceeds capacity ({}); every request will be rate limited",
                    rate_limit.requested, rate_limit.capacity
                ),
                Some("rate_limit.requested"),
            );
        }
        if rate_limit.rate == 0 {
            result.warning("rate is 0; buckets never refill", Some("rate_limit.rate"));
        }
    } else {
        result.warning("Rate limiting is disabled", Some("rate_limit.enabled"));
    }

    if config.store.backend == StoreBackend::Memory {
        result.warning(
            "In-memory store does not share buckets between gateway processes",
            Some("store.backend"),
        );
    }
}

/// Print the validation result.
fn print_result(result: &ValidationResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            if result.valid {
                output::json(&CommandResult::success(result))
            } else {
                output::json(&CommandResult::failure(
                    Some(result),
                    "Validation failed",
                    Some("configuration_error"),
                ))
            }
        }
        OutputFormat::Text => {
            if result.valid {
                output::success(&format!("Configuration file is valid: {}", result.file));
            } else {
                output::error(&format!("Configuration file is invalid: {}", result.file));
            }
            for message in result.errors.iter().chain(&result.warnings) {
                let text = match &message.path {
                    Some(path) => format!("{path}: {}", message.message),
                    None => message.message.clone(),
                };
                if message.level == "error" {
                    output::error(&text);
                } else {
                    output::warning(&text);
                }
            }
            Ok(())
        }
    }
}
