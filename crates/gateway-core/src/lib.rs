//! # Gateway Core
//!
//! Core types and error handling for the LLM Gatekeeper.
//!
//! This crate provides the foundational types shared by the gatekeeping crates:
//! - The per-request context written by model mapping and read by dispatch
//! - The error taxonomy for admission control and model mapping

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod error;

// Re-export commonly used types
pub use context::RequestContext;
pub use error::{GatewayError, GatewayResult};
