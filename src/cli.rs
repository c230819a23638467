//! CLI argument definitions using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, GlobalArgs};

/// LLM Gatekeeper - admission control and model mapping for the inference gateway
#[derive(Parser, Debug)]
#[command(name = "llm-gatekeeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one admission and model mapping decision
    Check(commands::check::CheckArgs),

    /// Resolve a model through the alias table
    Resolve(commands::resolve::ResolveArgs),

    /// Validate a configuration file
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Check(args) => commands::check::execute(args, self.global).await,
            Commands::Resolve(args) => commands::resolve::execute(args, self.global).await,
            Commands::Validate(args) => commands::validate::execute(args, self.global).await,
        }
    }
}
