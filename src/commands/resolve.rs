//! Resolve command - resolve a model through the alias table.

use anyhow::Result;
use clap::Args;
use gateway_routing::resolve_mapping;
use serde::Serialize;
use std::path::PathBuf;

use super::GlobalArgs;
use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the resolve command.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Model requested by the caller
    #[arg(short, long)]
    pub model: String,

    /// Alias table as a JSON object (defaults to the configured table)
    #[arg(long)]
    pub mapping: Option<String>,

    /// Configuration file (defaults to $GATEKEEPER_CONFIG when set)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Resolution result.
#[derive(Debug, Serialize)]
pub struct ResolveResult {
    pub origin_model: String,
    pub upstream_model: String,
    pub is_model_mapped: bool,
}

/// Execute the resolve command.
pub async fn execute(args: ResolveArgs, global: GlobalArgs) -> Result<()> {
    let format = OutputFormat::from_json_flag(global.json);

    let config = super::load_config(args.config.as_deref()).await?;
    super::init_tracing(&config.logging, global);

    let mapping = args.mapping.unwrap_or(config.model_mapping);

    match resolve_mapping(&args.model, &mapping) {
        Ok(outcome) => {
            let result = ResolveResult {
                origin_model: args.model,
                upstream_model: outcome.upstream_model,
                is_model_mapped: outcome.is_mapped,
            };
            match format {
                OutputFormat::Json => output::json(&CommandResult::success(result)),
                OutputFormat::Text => {
                    if result.is_model_mapped {
                        output::success(&format!(
                            "{} -> {}",
                            result.origin_model, result.upstream_model
                        ));
                    } else {
                        output::success(&format!("{} (not mapped)", result.origin_model));
                    }
                    Ok(())
                }
            }
        }
        Err(e) => {
            match format {
                OutputFormat::Json => output::json(&CommandResult::<ResolveResult>::failure(
                    None,
                    e.to_string(),
                    Some(e.error_code()),
                ))?,
                OutputFormat::Text => output::error(&e.to_string()),
            }
            Err(e.into())
        }
    }
}
