//! # Gateway Routing
//!
//! Model-aware request routing for the LLM Gatekeeper.
//!
//! This crate provides:
//! - Parsing of operator-supplied model mapping (alias) tables
//! - Cycle-safe resolution of chained model redirections
//! - Writing the resolved upstream model onto the request context

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model_mapping;

// Re-export main types
pub use model_mapping::{apply_model_mapping, resolve_mapping, MappingOutcome, ModelMapping};
