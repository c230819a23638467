//! # LLM Gatekeeper
//!
//! Request gatekeeping for the LLM Inference Gateway. Every inbound request
//! passes two checks before it is dispatched upstream:
//!
//! 1. Admission control: a token bucket shared by all gateway processes,
//!    evaluated atomically inside Redis.
//! 2. Model mapping: the requested model is redirected through the operator's
//!    alias table, with chains followed and cycles rejected.
//!
//! ## Usage
//!
//! ```no_run
//! use gateway_config::{GatekeeperConfig, SharedConfig};
//! use gateway_core::RequestContext;
//! use llm_gatekeeper::{Decision, Gatekeeper};
//!
//! # async fn run() -> gateway_core::GatewayResult<()> {
//! let gatekeeper = Gatekeeper::from_config(SharedConfig::new(GatekeeperConfig::default())).await?;
//!
//! let mut ctx = RequestContext::new("gpt-4");
//! if gatekeeper.check("tenant-42", &mut ctx).await? == Decision::Admitted {
//!     println!("dispatch to {}", ctx.upstream_model_name());
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod gatekeeper;

pub use bootstrap::{build_store, limiter_options, logging_config};
pub use gatekeeper::{Decision, Gatekeeper};
