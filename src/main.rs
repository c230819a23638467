//! LLM Gatekeeper CLI
//!
//! Operator tooling for the gatekeeping core: run one admission and mapping
//! decision against the configured store, resolve models offline, and
//! validate configuration files.
//!
//! ## Usage
//!
//! ```bash
//! # Admit one request for tenant-42 asking for gpt-4
//! llm-gatekeeper check --key tenant-42 --model gpt-4 --config gatekeeper.toml
//!
//! # Resolve a model through an inline alias table
//! llm-gatekeeper resolve --model gpt-4 --mapping '{"gpt-4":"gpt-4o"}'
//!
//! # Validate a config file
//! GATEKEEPER_CONFIG=gatekeeper.yaml llm-gatekeeper validate --strict
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Logging is installed by each command once its configuration is loaded
    Cli::parse().execute().await
}
