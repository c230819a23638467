//! Configuration loading.
//!
//! Precedence, lowest to highest: built-in defaults, the config file,
//! `GATEKEEPER_*` environment variables. The merged result is validated
//! before it is returned.

use crate::config::GatekeeperConfig;
use gateway_core::{GatewayError, GatewayResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

/// Environment variable naming the config file used by [`load_config`]
pub const CONFIG_PATH_ENV: &str = "GATEKEEPER_CONFIG";

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    ///
    /// # Errors
    /// Returns error for unknown or missing extensions
    pub fn from_path(path: &Path) -> GatewayResult<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(GatewayError::configuration(format!(
                "cannot infer config format from {}",
                path.display()
            ))),
        }
    }

    /// Parse config text in this format
    ///
    /// # Errors
    /// Returns error if the text does not match the schema
    pub fn parse(self, contents: &str) -> GatewayResult<GatekeeperConfig> {
        let parsed = match self {
            Self::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| GatewayError::configuration(format!("failed to parse config: {e}")))
    }
}

/// Builder-style configuration loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    use_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            file: None,
            use_env: true,
        }
    }
}

impl ConfigLoader {
    /// Create a loader with no file and environment overrides enabled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the given config file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skip `GATEKEEPER_*` environment overrides
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Config file this loader reads, if any
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Load, merge and validate the configuration
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, an override is
    /// malformed, or validation fails
    pub async fn load(&self) -> GatewayResult<GatekeeperConfig> {
        let contents = match &self.file {
            Some(path) => Some(tokio::fs::read_to_string(path).await.map_err(|e| {
                GatewayError::configuration(format!("failed to read {}: {e}", path.display()))
            })?),
            None => None,
        };
        self.finish(contents.as_deref())
    }

    fn finish(&self, contents: Option<&str>) -> GatewayResult<GatekeeperConfig> {
        let mut config = match (&self.file, contents) {
            (Some(path), Some(contents)) => {
                let config = ConfigFormat::from_path(path)?.parse(contents)?;
                debug!(path = %path.display(), "Config file parsed");
                config
            }
            _ => GatekeeperConfig::default(),
        };

        if self.use_env {
            apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        }

        config
            .validate()
            .map_err(|e| GatewayError::configuration(format!("invalid configuration: {e}")))?;

        Ok(config)
    }
}

/// Load configuration from the file named by `GATEKEEPER_CONFIG` (if set)
/// plus environment overrides
///
/// # Errors
/// Returns error if loading or validation fails
pub async fn load_config() -> GatewayResult<GatekeeperConfig> {
    let mut loader = ConfigLoader::new();
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        info!(path = %path, "Loading configuration file");
        loader = loader.with_file(path);
    }
    loader.load().await
}

/// Apply `GATEKEEPER_*` overrides read through `lookup`
///
/// # Errors
/// Returns error if a numeric, boolean or backend override cannot be parsed
pub fn apply_overrides<F>(config: &mut GatekeeperConfig, lookup: F) -> GatewayResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("GATEKEEPER_REDIS_URL") {
        config.store.redis_url = url;
    }
    if let Some(prefix) = lookup("GATEKEEPER_KEY_PREFIX") {
        config.store.key_prefix = Some(prefix).filter(|p| !p.is_empty());
    }
    if let Some(backend) = lookup("GATEKEEPER_STORE_BACKEND") {
        config.store.backend = backend.parse().map_err(GatewayError::configuration)?;
    }
    if let Some(enabled) = lookup("GATEKEEPER_RATE_LIMIT_ENABLED") {
        config.rate_limit.enabled = parse_bool("GATEKEEPER_RATE_LIMIT_ENABLED", &enabled)?;
    }
    if let Some(capacity) = lookup("GATEKEEPER_RATE_LIMIT_CAPACITY") {
        config.rate_limit.capacity = parse_u32("GATEKEEPER_RATE_LIMIT_CAPACITY", &capacity)?;
    }
    if let Some(rate) = lookup("GATEKEEPER_RATE_LIMIT_RATE") {
        config.rate_limit.rate = parse_u32("GATEKEEPER_RATE_LIMIT_RATE", &rate)?;
    }
    if let Some(requested) = lookup("GATEKEEPER_RATE_LIMIT_REQUESTED") {
        config.rate_limit.requested = parse_u32("GATEKEEPER_RATE_LIMIT_REQUESTED", &requested)?;
    }
    if let Some(mapping) = lookup("GATEKEEPER_MODEL_MAPPING") {
        config.model_mapping = mapping;
    }
    if let Some(level) = lookup("GATEKEEPER_LOG_LEVEL") {
        config.logging.level = level;
    }
    Ok(())
}

fn parse_u32(name: &str, value: &str) -> GatewayResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| GatewayError::configuration(format!("{name} must be a non-negative integer, got '{value}'")))
}

fn parse_bool(name: &str, value: &str) -> GatewayResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GatewayError::configuration(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}
