//! Configuration types.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Top-level gatekeeper configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GatekeeperConfig {
    /// Shared store connection
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreConfig,

    /// Default token bucket parameters
    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,

    /// Serialized model mapping table (JSON object of model name to model name)
    #[serde(default)]
    pub model_mapping: String,

    /// Logging output
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingSettings,
}

/// Which store holds token bucket state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis instance
    #[default]
    Redis,
    /// In-process store, not shared between processes
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Shared store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    /// Store backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    #[validate(custom(function = "validate_redis_url"))]
    pub redis_url: String,

    /// Prefix for bucket keys (namespace isolation)
    #[serde(default)]
    pub key_prefix: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            key_prefix: None,
        }
    }
}

/// Default token bucket parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    /// Whether admission control runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum tokens a bucket holds
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1))]
    pub capacity: u32,

    /// Tokens added per second
    #[serde(default = "default_rate")]
    pub rate: u32,

    /// Tokens consumed per request
    #[serde(default = "default_requested")]
    #[validate(range(min = 1))]
    pub requested: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_capacity(),
            rate: default_rate(),
            requested: default_requested(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LoggingSettings {
    /// Filter directive (e.g., "info", "gateway_resilience=debug")
    #[serde(default = "default_log_level")]
    #[validate(length(min = 1))]
    pub level: String,

    /// Output format: pretty, compact or json
    #[serde(default = "default_log_format")]
    #[validate(custom(function = "validate_log_format"))]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_capacity() -> u32 {
    10
}

fn default_rate() -> u32 {
    1
}

fn default_requested() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn validate_redis_url(url: &str) -> Result<(), ValidationError> {
    const SCHEMES: [&str; 4] = ["redis://", "rediss://", "redis+unix://", "unix://"];
    if SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_redis_url"))
    }
}

fn validate_log_format(format: &str) -> Result<(), ValidationError> {
    match format.to_ascii_lowercase().as_str() {
        "pretty" | "compact" | "text" | "json" => Ok(()),
        _ => Err(ValidationError::new("invalid_log_format")),
    }
}
