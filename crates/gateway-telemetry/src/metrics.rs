//! Prometheus counters for gatekeeping outcomes.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Metric name prefix
    pub namespace: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "gatekeeper".to_string(),
        }
    }
}

/// Outcome label for an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Request admitted
    Allowed,
    /// Request rate limited
    Denied,
    /// Store could not decide
    Error,
}

impl AdmissionOutcome {
    /// Label value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }
}

/// Outcome label for a model mapping resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingStatus {
    /// Origin model used as-is
    Unmapped,
    /// Origin model redirected
    Mapped,
    /// Mapping table could not be parsed
    ParseError,
    /// Mapping table loops
    CycleError,
}

impl MappingStatus {
    /// Label value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unmapped => "unmapped",
            Self::Mapped => "mapped",
            Self::ParseError => "parse_error",
            Self::CycleError => "cycle_error",
        }
    }
}

/// Gatekeeper metrics registry
pub struct Metrics {
    registry: Registry,
    admission_decisions: IntCounterVec,
    model_mappings: IntCounterVec,
}

impl Metrics {
    /// Create and register all counters
    ///
    /// # Errors
    /// Returns error if a counter cannot be registered
    pub fn new(config: &MetricsConfig) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let admission_decisions = IntCounterVec::new(
            Opts::new("admission_decisions_total", "Admission decisions by outcome")
                .namespace(config.namespace.clone()),
            &["outcome"],
        )?;
        registry.register(Box::new(admission_decisions.clone()))?;

        let model_mappings = IntCounterVec::new(
            Opts::new("model_mapping_total", "Model mapping resolutions by outcome")
                .namespace(config.namespace.clone()),
            &["outcome"],
        )?;
        registry.register(Box::new(model_mappings.clone()))?;

        Ok(Self {
            registry,
            admission_decisions,
            model_mappings,
        })
    }

    /// Count one admission decision
    pub fn record_admission(&self, outcome: AdmissionOutcome) {
        self.admission_decisions
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Count one model mapping resolution
    pub fn record_mapping(&self, status: MappingStatus) {
        self.model_mappings.with_label_values(&[status.as_str()]).inc();
    }

    /// Current admission count for an outcome
    #[must_use]
    pub fn admission_count(&self, outcome: AdmissionOutcome) -> u64 {
        self.admission_decisions
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    /// Current mapping count for a status
    #[must_use]
    pub fn mapping_count(&self, status: MappingStatus) -> u64 {
        self.model_mappings.with_label_values(&[status.as_str()]).get()
    }

    /// Underlying registry
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
