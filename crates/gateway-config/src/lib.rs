//! # Gateway Config
//!
//! Configuration management for the LLM Gatekeeper.
//!
//! This crate provides:
//! - Typed, validated configuration for the shared store, rate limits and model mapping
//! - Loading from TOML, YAML or JSON files with `GATEKEEPER_*` environment overrides
//! - A lock-free shared snapshot that can be swapped at runtime
//! - A file watcher that reloads the snapshot when the file changes

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod loader;
pub mod shared;
pub mod watcher;

// Re-export main types
pub use config::{GatekeeperConfig, LoggingSettings, RateLimitConfig, StoreBackend, StoreConfig};
pub use loader::{apply_overrides, load_config, ConfigFormat, ConfigLoader};
pub use shared::SharedConfig;
pub use watcher::{reload, ConfigWatcher};
