//! Distributed admission control.
//!
//! Admission decisions use a token bucket whose state lives in a shared
//! store. The whole refill-and-consume step runs as one store-side script, so
//! any number of gateway processes can share a bucket without client-side
//! locking and without losing updates.
//!
//! Construct one [`AdmissionController`] per process at startup and share it
//! behind an `Arc`. The script is preloaded during construction; if that
//! fails the controller is still returned, but every decision reports an
//! error until the process is restarted.

use crate::store::{ScriptStore, ScriptStoreError, TOKEN_BUCKET_SCRIPT};
use gateway_core::{GatewayError, GatewayResult};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default bucket capacity
pub const DEFAULT_CAPACITY: u32 = 10;

/// Default refill rate in tokens per second
pub const DEFAULT_RATE: u32 = 1;

/// Default tokens consumed per call
pub const DEFAULT_REQUESTED: u32 = 1;

/// Per-call token bucket parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterOptions {
    /// Maximum tokens the bucket holds
    pub capacity: u32,
    /// Tokens added per second
    pub rate: u32,
    /// Tokens this call consumes
    pub requested: u32,
}

impl Default for LimiterOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            rate: DEFAULT_RATE,
            requested: DEFAULT_REQUESTED,
        }
    }
}

impl LimiterOptions {
    /// Create options with the default capacity, rate and requested tokens
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bucket capacity
    #[must_use]
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the refill rate
    #[must_use]
    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = rate;
        self
    }

    /// Set the tokens consumed by this call
    #[must_use]
    pub fn with_requested(mut self, requested: u32) -> Self {
        self.requested = requested;
        self
    }
}

/// What to do when the store cannot answer.
///
/// There is intentionally no default: each caller picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Admit the request
    FailOpen,
    /// Reject the request
    FailClosed,
}

impl FailurePolicy {
    fn decision(self) -> bool {
        matches!(self, Self::FailOpen)
    }
}

/// Token bucket admission controller over a shared script store
pub struct AdmissionController {
    store: Arc<dyn ScriptStore>,
    script_sha: Option<String>,
    key_prefix: Option<String>,
}

impl AdmissionController {
    /// Create a controller and preload the token bucket script.
    ///
    /// A preload failure is logged and leaves the controller unable to make
    /// decisions; it is not retried.
    pub async fn new(store: Arc<dyn ScriptStore>) -> Self {
        Self::with_key_prefix(store, None).await
    }

    /// Create a controller that namespaces every bucket key under `prefix`
    pub async fn with_key_prefix(store: Arc<dyn ScriptStore>, prefix: Option<String>) -> Self {
        let script_sha = match store.script_load(TOKEN_BUCKET_SCRIPT).await {
            Ok(sha) => {
                info!(backend = store.name(), sha = %sha, "Rate limit script loaded");
                Some(sha)
            }
            Err(e) => {
                let err = GatewayError::admission_script_load(e.to_string());
                error!(
                    backend = store.name(),
                    error = %err,
                    "Failed to load rate limit script; admission checks will fail until restart"
                );
                None
            }
        };

        Self {
            store,
            script_sha,
            key_prefix: prefix.filter(|p| !p.is_empty()),
        }
    }

    /// Check if the script was preloaded and decisions can be made
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.script_sha.is_some()
    }

    /// Content hash of the preloaded script
    #[must_use]
    pub fn script_sha(&self) -> Option<&str> {
        self.script_sha.as_deref()
    }

    /// Check if bucket state is shared across processes
    #[must_use]
    pub fn is_distributed(&self) -> bool {
        self.store.is_distributed()
    }

    fn bucket_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_string(),
        }
    }

    /// Decide whether `key` may consume `options.requested` tokens.
    ///
    /// Returns `Ok(false)` when the bucket is short of tokens. Store failures
    /// are returned as errors and never turned into a decision.
    ///
    /// # Errors
    /// Returns `GatewayError::AdmissionBackend` if the script is not loaded or
    /// the store call fails
    pub async fn allow(&self, key: &str, options: &LimiterOptions) -> GatewayResult<bool> {
        let Some(sha) = self.script_sha.as_deref() else {
            return Err(GatewayError::admission_backend(
                "rate limit script is not loaded",
            ));
        };

        let bucket_key = self.bucket_key(key);
        let args = [
            i64::from(options.requested),
            i64::from(options.rate),
            i64::from(options.capacity),
        ];

        let reply = self
            .store
            .eval_sha(sha, &[bucket_key.as_str()], &args)
            .await
            .map_err(|e| {
                warn!(key = %key, backend = self.store.name(), error = %e, "Rate limit check failed");
                backend_error(e)
            })?;

        let allowed = reply == 1;
        debug!(
            key = %key,
            requested = options.requested,
            capacity = options.capacity,
            rate = options.rate,
            allowed = allowed,
            "Rate limit decision"
        );

        Ok(allowed)
    }

    /// Like [`allow`](Self::allow), but resolves store failures with `policy`
    pub async fn allow_or(&self, key: &str, options: &LimiterOptions, policy: FailurePolicy) -> bool {
        match self.allow(key, options).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(key = %key, policy = ?policy, error = %e, "Rate limit backend unavailable, applying failure policy");
                policy.decision()
            }
        }
    }
}

fn backend_error(err: ScriptStoreError) -> GatewayError {
    let message = match &err {
        ScriptStoreError::NoScript(_) => "rate limit script missing from store".to_string(),
        other => other.to_string(),
    };
    GatewayError::admission_backend_with_source(message, err)
}
