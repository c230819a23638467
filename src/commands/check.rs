//! Check command - run one gatekeeping decision.

use anyhow::Result;
use clap::{Args, ValueEnum};
use gateway_config::SharedConfig;
use gateway_core::RequestContext;
use gateway_resilience::FailurePolicy;
use llm_gatekeeper::{Decision, Gatekeeper};
use serde::Serialize;
use std::path::PathBuf;

use super::GlobalArgs;
use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Rate limit key (tenant, API key or user id)
    #[arg(short, long)]
    pub key: String,

    /// Model requested by the caller
    #[arg(short, long)]
    pub model: String,

    /// Bucket capacity (overrides configuration)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub capacity: Option<u32>,

    /// Refill rate in tokens per second (overrides configuration)
    #[arg(long)]
    pub rate: Option<u32>,

    /// Tokens consumed by this request (overrides configuration)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub requested: Option<u32>,

    /// What to do when the store cannot be reached
    #[arg(long, value_enum)]
    pub on_error: Option<OnError>,

    /// Configuration file (defaults to $GATEKEEPER_CONFIG when set)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Store failure handling selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    /// Admit the request
    FailOpen,
    /// Reject the request
    FailClosed,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::FailOpen => Self::FailOpen,
            OnError::FailClosed => Self::FailClosed,
        }
    }
}

/// Check result.
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub key: String,
    pub decision: Option<Decision>,
    pub request_id: String,
    pub origin_model: String,
    pub upstream_model: String,
    pub is_model_mapped: bool,
    pub store: &'static str,
}

/// Execute the check command.
pub async fn execute(args: CheckArgs, global: GlobalArgs) -> Result<()> {
    let format = OutputFormat::from_json_flag(global.json);

    let mut config = super::load_config(args.config.as_deref()).await?;
    super::init_tracing(&config.logging, global);

    if let Some(capacity) = args.capacity {
        config.rate_limit.capacity = capacity;
    }
    if let Some(rate) = args.rate {
        config.rate_limit.rate = rate;
    }
    if let Some(requested) = args.requested {
        config.rate_limit.requested = requested;
    }

    let gatekeeper = Gatekeeper::from_config(SharedConfig::new(config)).await?;
    let mut ctx = RequestContext::new(args.model);

    let outcome = match args.on_error {
        Some(policy) => gatekeeper.check_or(&args.key, &mut ctx, policy.into()).await,
        None => gatekeeper.check(&args.key, &mut ctx).await,
    };

    let store = if gatekeeper.admission().is_distributed() {
        "redis"
    } else {
        "memory"
    };
    let mut result = CheckResult {
        key: args.key,
        decision: None,
        request_id: ctx.request_id().to_string(),
        origin_model: ctx.origin_model_name().to_string(),
        upstream_model: ctx.upstream_model_name().to_string(),
        is_model_mapped: ctx.is_model_mapped(),
        store,
    };

    match outcome {
        Ok(decision) => {
            result.decision = Some(decision);
            print_result(result, format)
        }
        Err(e) => {
            match format {
                OutputFormat::Json => {
                    output::json(&CommandResult::failure(
                        Some(result),
                        e.to_string(),
                        Some(e.error_code()),
                    ))?;
                }
                OutputFormat::Text => {
                    output::error(&format!("{} ({})", e, e.error_code()));
                }
            }
            Err(e.into())
        }
    }
}

/// Print the check result.
fn print_result(result: CheckResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => output::json(&CommandResult::success(result)),
        OutputFormat::Text => {
            match result.decision {
                Some(Decision::Admitted) => output::success("Request admitted"),
                Some(Decision::RateLimited) => output::warning("Request rate limited"),
                None => {}
            }
            output::key_value("Key", &result.key);
            output::key_value("Request ID", &result.request_id);
            output::key_value("Origin model", &result.origin_model);
            output::key_value("Upstream model", &result.upstream_model);
            output::key_value("Mapped", &result.is_model_mapped.to_string());
            output::key_value("Store", result.store);
            Ok(())
        }
    }
}
