//! Error types for the gatekeeping core.
//!
//! Admission denial is not an error: it is the `false` outcome of an admission
//! check. The variants here cover the cases where no decision could be made.

use thiserror::Error;

/// Result type for gatekeeping operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised by admission control and model mapping
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The shared store could not be reached or the rate limit script failed
    #[error("Rate limit backend error: {message}")]
    AdmissionBackend {
        /// Error message
        message: String,
        /// Underlying store error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The rate limit script could not be preloaded into the shared store
    #[error("Rate limit script load failed: {message}")]
    AdmissionScriptLoad {
        /// Error message
        message: String,
    },

    /// The serialized model mapping table is malformed
    #[error("Invalid model mapping: {message}")]
    MappingParse {
        /// Error message
        message: String,
        /// Underlying decode error
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The model mapping table contains a cycle reachable from the origin model
    #[error("Model mapping contains a cycle: '{origin}' revisits '{model}'")]
    MappingCycle {
        /// Model name the resolution started from
        origin: String,
        /// Model name that was reached a second time
        model: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Create a new admission backend error
    pub fn admission_backend(message: impl Into<String>) -> Self {
        Self::AdmissionBackend {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new admission backend error wrapping a store error
    pub fn admission_backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::AdmissionBackend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new script load error
    pub fn admission_script_load(message: impl Into<String>) -> Self {
        Self::AdmissionScriptLoad {
            message: message.into(),
        }
    }

    /// Create a new mapping parse error from a decode failure
    pub fn mapping_parse(source: serde_json::Error) -> Self {
        Self::MappingParse {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a new mapping cycle error
    pub fn mapping_cycle(origin: impl Into<String>, model: impl Into<String>) -> Self {
        Self::MappingCycle {
            origin: origin.into(),
            model: model.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Stable machine-readable code for rendering a rejection
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AdmissionBackend { .. } => "rate_limit_backend_error",
            Self::AdmissionScriptLoad { .. } => "rate_limit_script_unavailable",
            Self::MappingParse { .. } => "model_mapping_invalid",
            Self::MappingCycle { .. } => "model_mapping_cycle",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Check if this error came from admission control
    #[must_use]
    pub fn is_admission_error(&self) -> bool {
        matches!(
            self,
            Self::AdmissionBackend { .. } | Self::AdmissionScriptLoad { .. }
        )
    }

    /// Check if this error came from model mapping
    #[must_use]
    pub fn is_mapping_error(&self) -> bool {
        matches!(self, Self::MappingParse { .. } | Self::MappingCycle { .. })
    }
}
