//! # Gateway Telemetry
//!
//! Observability for the LLM Gatekeeper.
//!
//! This crate provides:
//! - Structured logging setup
//! - Prometheus counters for admission and model mapping outcomes

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

// Re-export main types
pub use logging::{init_logging, LogFormat, LogOutput, LoggingConfig, LoggingError};
pub use metrics::{AdmissionOutcome, MappingStatus, Metrics, MetricsConfig};
