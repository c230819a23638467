//! Hot reload of the configuration file.

use crate::config::GatekeeperConfig;
use crate::loader::ConfigLoader;
use crate::shared::SharedConfig;
use gateway_core::{GatewayError, GatewayResult};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Quiet period after the last file event before the file is read again
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the config file and swaps new snapshots into a [`SharedConfig`].
///
/// A file that fails to load or validate is logged and the current snapshot
/// is kept. Dropping the watcher stops it.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching the loader's file. Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns error if the loader has no file or the watch cannot be set up
    pub fn start(loader: ConfigLoader, shared: SharedConfig) -> GatewayResult<Self> {
        let path = loader
            .file()
            .map(std::path::Path::to_path_buf)
            .ok_or_else(|| GatewayError::configuration("config watcher needs a config file"))?;

        let (tx, rx) = mpsc::channel(16);
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = tx.try_send(());
                    }
                }
            },
            NotifyConfig::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| GatewayError::configuration(format!("failed to create watcher: {e}")))?;

        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|e| GatewayError::configuration(format!("failed to watch {}: {e}", path.display())))?;

        info!(path = %path.display(), "Watching configuration file");

        let task = tokio::spawn(reload_on_change(rx, loader, shared, DEBOUNCE));

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Reload once per burst of change events.
///
/// Every event restarts the quiet period, so the last write of a burst is
/// always the one that gets loaded.
async fn reload_on_change(
    mut rx: mpsc::Receiver<()>,
    loader: ConfigLoader,
    shared: SharedConfig,
    quiet: Duration,
) {
    while rx.recv().await.is_some() {
        loop {
            match tokio::time::timeout(quiet, rx.recv()).await {
                Ok(Some(())) => debug!("Debouncing config change"),
                Ok(None) | Err(_) => break,
            }
        }

        if let Err(e) = reload(&loader, &shared).await {
            error!(error = %e, "Failed to reload configuration");
            warn!("Keeping current configuration");
        }
    }
}

/// Load the configuration once and swap it in on success
///
/// # Errors
/// Returns error if loading fails; the shared snapshot is left untouched
pub async fn reload(loader: &ConfigLoader, shared: &SharedConfig) -> GatewayResult<()> {
    let next = loader.load().await?;
    let current = shared.snapshot();

    for field in restart_only_changes(&current, &next) {
        warn!(field, "Change takes effect after restart");
    }

    shared.replace(next);
    info!("Configuration reloaded");
    Ok(())
}

/// Fields whose changes are only picked up when the process restarts
fn restart_only_changes(current: &GatekeeperConfig, next: &GatekeeperConfig) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if current.store.backend != next.store.backend {
        fields.push("store.backend");
    }
    if current.store.redis_url != next.store.redis_url {
        fields.push("store.redis_url");
    }
    if current.store.key_prefix != next.store.key_prefix {
        fields.push("store.key_prefix");
    }
    if current.logging != next.logging {
        fields.push("logging");
    }
    fields
}
