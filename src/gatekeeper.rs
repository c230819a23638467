//! Per-request gatekeeping.

use crate::bootstrap::{build_store, limiter_options};
use gateway_config::{ConfigLoader, ConfigWatcher, SharedConfig};
use gateway_core::{GatewayError, GatewayResult, RequestContext};
use gateway_resilience::{AdmissionController, FailurePolicy};
use gateway_routing::apply_model_mapping;
use gateway_telemetry::{AdmissionOutcome, MappingStatus, Metrics};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a gatekeeping check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Dispatch the request to `RequestContext::upstream_model_name`
    Admitted,
    /// Reject the request with a rate limit response
    RateLimited,
}

/// Admission control followed by model mapping, for one request at a time.
///
/// Cheap to clone; clones share the controller, configuration and metrics.
#[derive(Clone)]
pub struct Gatekeeper {
    admission: Arc<AdmissionController>,
    config: SharedConfig,
    metrics: Option<Arc<Metrics>>,
}

impl Gatekeeper {
    /// Create a gatekeeper over an existing controller
    #[must_use]
    pub fn new(admission: Arc<AdmissionController>, config: SharedConfig) -> Self {
        Self {
            admission,
            config,
            metrics: None,
        }
    }

    /// Build the store and controller described by the current configuration.
    ///
    /// The rate limit script is preloaded here. A preload failure does not
    /// fail construction; see [`AdmissionController`].
    ///
    /// # Errors
    /// Returns error if the store configuration is unusable
    pub async fn from_config(config: SharedConfig) -> GatewayResult<Self> {
        let snapshot = config.snapshot();
        let store = build_store(&snapshot.store)?;
        let admission =
            AdmissionController::with_key_prefix(store, snapshot.store.key_prefix.clone()).await;

        if !admission.is_ready() {
            warn!("Gatekeeper started without a loaded rate limit script");
        }

        Ok(Self::new(Arc::new(admission), config))
    }

    /// Record decisions in `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Underlying admission controller
    #[must_use]
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Shared configuration
    #[must_use]
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Reload the loader's file into this gatekeeper's configuration
    /// whenever it changes, until the returned watcher is dropped.
    ///
    /// Rate limits and the alias table apply to the next request; store and
    /// logging changes need a restart.
    ///
    /// # Errors
    /// Returns error if the loader has no file or it cannot be watched
    pub fn watch_config(&self, loader: ConfigLoader) -> GatewayResult<ConfigWatcher> {
        ConfigWatcher::start(loader, self.config.clone())
    }

    /// Run admission control for `key`, then resolve the model on `ctx`.
    ///
    /// A rate limited request is returned as [`Decision::RateLimited`] and
    /// its context is left unmapped. Store failures and mapping failures are
    /// errors; on a mapping failure the context is untouched.
    ///
    /// # Errors
    /// Returns the admission or mapping error
    pub async fn check(&self, key: &str, ctx: &mut RequestContext) -> GatewayResult<Decision> {
        let config = self.config.snapshot();

        if config.rate_limit.enabled {
            let options = limiter_options(&config.rate_limit);
            match self.admission.allow(key, &options).await {
                Ok(true) => self.record_admission(AdmissionOutcome::Allowed),
                Ok(false) => {
                    self.record_admission(AdmissionOutcome::Denied);
                    info!(
                        request_id = %ctx.request_id(),
                        key = %key,
                        "Request rate limited"
                    );
                    return Ok(Decision::RateLimited);
                }
                Err(e) => {
                    self.record_admission(AdmissionOutcome::Error);
                    return Err(e);
                }
            }
        }

        self.map_model(ctx, &config.model_mapping)?;
        Ok(Decision::Admitted)
    }

    /// Like [`check`](Self::check), but a store failure is resolved with
    /// `policy` instead of being returned
    ///
    /// # Errors
    /// Returns mapping errors only
    pub async fn check_or(
        &self,
        key: &str,
        ctx: &mut RequestContext,
        policy: FailurePolicy,
    ) -> GatewayResult<Decision> {
        match self.check(key, ctx).await {
            Err(e) if e.is_admission_error() => {
                warn!(key = %key, policy = ?policy, error = %e, "Applying rate limit failure policy");
                match policy {
                    FailurePolicy::FailOpen => {
                        let config = self.config.snapshot();
                        self.map_model(ctx, &config.model_mapping)?;
                        Ok(Decision::Admitted)
                    }
                    FailurePolicy::FailClosed => Ok(Decision::RateLimited),
                }
            }
            other => other,
        }
    }

    /// Resolve the model on `ctx` against the current alias table, without
    /// admission control
    ///
    /// # Errors
    /// Returns the mapping error; the context is untouched
    pub fn resolve(&self, ctx: &mut RequestContext) -> GatewayResult<()> {
        let config = self.config.snapshot();
        self.map_model(ctx, &config.model_mapping)
    }

    fn map_model(&self, ctx: &mut RequestContext, serialized: &str) -> GatewayResult<()> {
        match apply_model_mapping(ctx, serialized) {
            Ok(()) => {
                let status = if ctx.is_model_mapped() {
                    MappingStatus::Mapped
                } else {
                    MappingStatus::Unmapped
                };
                self.record_mapping(status);
                debug!(
                    request_id = %ctx.request_id(),
                    origin = %ctx.origin_model_name(),
                    upstream = %ctx.upstream_model_name(),
                    "Model resolved"
                );
                Ok(())
            }
            Err(e) => {
                let status = match e {
                    GatewayError::MappingCycle { .. } => MappingStatus::CycleError,
                    _ => MappingStatus::ParseError,
                };
                self.record_mapping(status);
                warn!(
                    request_id = %ctx.request_id(),
                    origin = %ctx.origin_model_name(),
                    error = %e,
                    "Model mapping failed"
                );
                Err(e)
            }
        }
    }

    fn record_admission(&self, outcome: AdmissionOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_admission(outcome);
        }
    }

    fn record_mapping(&self, status: MappingStatus) {
        if let Some(metrics) = &self.metrics {
            metrics.record_mapping(status);
        }
    }
}
