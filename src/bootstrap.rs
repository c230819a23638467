//! Wiring from configuration to runtime components.

use gateway_config::{LoggingSettings, RateLimitConfig, StoreBackend, StoreConfig};
use gateway_core::{GatewayError, GatewayResult};
use gateway_resilience::{LimiterOptions, MemoryScriptStore, RedisScriptStore, ScriptStore};
use gateway_telemetry::{LogFormat, LoggingConfig};
use std::sync::Arc;
use tracing::warn;

/// Create the script store selected by `config.backend`
///
/// # Errors
/// Returns error if the Redis URL cannot be parsed
pub fn build_store(config: &StoreConfig) -> GatewayResult<Arc<dyn ScriptStore>> {
    match config.backend {
        StoreBackend::Redis => {
            let store = RedisScriptStore::new(config.redis_url.as_str()).map_err(|e| {
                GatewayError::configuration(format!("invalid store.redis_url: {e}"))
            })?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory rate limit store; buckets are not shared between processes");
            Ok(Arc::new(MemoryScriptStore::new()))
        }
    }
}

/// Token bucket parameters from the rate limit section
#[must_use]
pub fn limiter_options(config: &RateLimitConfig) -> LimiterOptions {
    LimiterOptions::new()
        .with_capacity(config.capacity)
        .with_rate(config.rate)
        .with_requested(config.requested)
}

/// Logging setup from the logging section
///
/// # Errors
/// Returns error if the format name is unknown
pub fn logging_config(settings: &LoggingSettings) -> GatewayResult<LoggingConfig> {
    let format: LogFormat = settings
        .format
        .parse::<LogFormat>()
        .map_err(|e| GatewayError::configuration(e.to_string()))?;
    Ok(LoggingConfig::new()
        .with_level(settings.level.clone())
        .with_format(format))
}
