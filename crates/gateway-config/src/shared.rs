//! Shared configuration snapshot.

use crate::config::GatekeeperConfig;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Hot-swappable configuration shared by all request tasks.
///
/// Readers take a cheap snapshot and keep using it for the whole request,
/// even if a reload swaps in a newer one meanwhile.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<ArcSwap<GatekeeperConfig>>,
}

impl SharedConfig {
    /// Wrap an initial configuration
    #[must_use]
    pub fn new(config: GatekeeperConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<GatekeeperConfig> {
        self.inner.load_full()
    }

    /// Replace the configuration for all subsequent snapshots
    pub fn replace(&self, config: GatekeeperConfig) {
        self.inner.store(Arc::new(config));
    }

    /// Replace only the model mapping table
    pub fn set_model_mapping(&self, mapping: impl Into<String>) {
        let mapping = mapping.into();
        self.inner.rcu(|current| {
            let mut next = GatekeeperConfig::clone(current);
            next.model_mapping.clone_from(&mapping);
            next
        });
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(GatekeeperConfig::default())
    }
}
