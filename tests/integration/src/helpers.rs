//! Test helper utilities for integration tests

use gateway_config::{GatekeeperConfig, SharedConfig};
use gateway_resilience::{AdmissionController, ManualClock, MemoryScriptStore, RedisScriptStore};
use gateway_telemetry::{Metrics, MetricsConfig};
use llm_gatekeeper::Gatekeeper;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Store clock start used by memory-backed fixtures
pub const START_TIME: u64 = 1_700_000_000;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Redis tests that flush scripts must not overlap with other Redis tests
static REDIS_LOCK: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Serialize access to the shared Redis instance
pub async fn redis_guard() -> tokio::sync::MutexGuard<'static, ()> {
    REDIS_LOCK.lock().await
}

/// Redis URL for tests marked `#[ignore] // Requires Redis`
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// Bucket key that no other test run shares
pub fn unique_key(prefix: &str) -> String {
    format!("{prefix}:{}", uuid::Uuid::new_v4())
}

/// Memory store driven by a manual clock
pub fn memory_store() -> (ManualClock, Arc<MemoryScriptStore>) {
    let clock = ManualClock::new(START_TIME);
    let store = Arc::new(MemoryScriptStore::with_clock(Arc::new(clock.clone())));
    (clock, store)
}

/// Controller over a fresh Redis store
pub async fn redis_controller(prefix: Option<&str>) -> AdmissionController {
    let store = RedisScriptStore::new(redis_url()).expect("Failed to create Redis store");
    AdmissionController::with_key_prefix(Arc::new(store), prefix.map(str::to_string)).await
}

/// Memory-backed gatekeeper with metrics
pub struct TestGatekeeper {
    /// Store clock
    pub clock: ManualClock,
    /// Backing store
    pub store: Arc<MemoryScriptStore>,
    /// Recorded metrics
    pub metrics: Arc<Metrics>,
    /// Gatekeeper under test
    pub gatekeeper: Gatekeeper,
}

impl TestGatekeeper {
    /// Build a gatekeeper for `config` over a manual-clock memory store
    pub async fn new(config: GatekeeperConfig) -> Self {
        init_tracing();
        let (clock, store) = memory_store();
        let admission = Arc::new(AdmissionController::new(store.clone()).await);
        let metrics = Arc::new(Metrics::new(&MetricsConfig::default()).expect("metrics"));
        let gatekeeper =
            Gatekeeper::new(admission, SharedConfig::new(config)).with_metrics(metrics.clone());

        Self {
            clock,
            store,
            metrics,
            gatekeeper,
        }
    }

    /// Gatekeeper with the given capacity and alias table, other settings default
    pub async fn with(capacity: u32, mapping: &str) -> Self {
        let mut config = GatekeeperConfig::default();
        config.rate_limit.capacity = capacity;
        config.model_mapping = mapping.to_string();
        Self::new(config).await
    }
}
