//! In-process script store for single-instance deployments and tests.
//!
//! Only the token bucket script is understood. Each invocation runs under the
//! store's mutex, which gives it the same all-or-nothing behavior Redis gives
//! a Lua script, and reads time from the store's own clock.

use crate::store::{
    script_sha, BucketState, ScriptStore, ScriptStoreError, StoreResult, TOKEN_BUCKET_SCRIPT,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Time source for a store, in whole seconds
pub trait StoreClock: Send + Sync {
    /// Current time in seconds
    fn now_secs(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl StoreClock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `start` seconds
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the clock to an absolute reading
    pub fn set(&self, secs: u64) {
        self.now.store(secs, Ordering::SeqCst);
    }
}

impl StoreClock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct StoreState {
    scripts: HashSet<String>,
    buckets: HashMap<String, BucketState>,
}

/// In-memory script store
pub struct MemoryScriptStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn StoreClock>,
    token_bucket_sha: String,
}

impl MemoryScriptStore {
    /// Create a store backed by the wall clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store backed by the given clock
    #[must_use]
    pub fn with_clock(clock: Arc<dyn StoreClock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
            token_bucket_sha: script_sha(TOKEN_BUCKET_SCRIPT),
        }
    }

    /// Forget all registered scripts, as `SCRIPT FLUSH` or a restart would
    pub fn flush_scripts(&self) {
        self.state.lock().scripts.clear();
    }

    /// Current record for a bucket key
    #[must_use]
    pub fn bucket(&self, key: &str) -> Option<BucketState> {
        self.state.lock().buckets.get(key).copied()
    }

    /// Number of bucket records held
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.state.lock().buckets.len()
    }

    fn run_token_bucket(&self, key: &str, requested: f64, rate: f64, capacity: f64) -> i64 {
        let mut state = self.state.lock();
        let now = self.clock.now_secs();

        let tokens = match state.buckets.get(key) {
            None => capacity,
            Some(bucket) => {
                let elapsed = now.saturating_sub(bucket.last_refill_time) as f64;
                (bucket.tokens + elapsed * rate).min(capacity)
            }
        };

        let (tokens, allowed) = if tokens >= requested {
            (tokens - requested, 1)
        } else {
            (tokens, 0)
        };

        state.buckets.insert(
            key.to_string(),
            BucketState {
                tokens,
                last_refill_time: now,
            },
        );

        allowed
    }
}

impl Default for MemoryScriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptStore for MemoryScriptStore {
    async fn script_load(&self, source: &str) -> StoreResult<String> {
        let sha = script_sha(source);
        if sha != self.token_bucket_sha {
            return Err(ScriptStoreError::UnsupportedScript(sha));
        }

        self.state.lock().scripts.insert(sha.clone());
        debug!(sha = %sha, "Script registered in memory store");
        Ok(sha)
    }

    async fn eval_sha(&self, sha: &str, keys: &[&str], args: &[i64]) -> StoreResult<i64> {
        if !self.state.lock().scripts.contains(sha) {
            return Err(ScriptStoreError::NoScript(sha.to_string()));
        }

        match (keys, args) {
            ([key], [requested, rate, capacity]) => Ok(self.run_token_bucket(
                key,
                *requested as f64,
                *rate as f64,
                *capacity as f64,
            )),
            _ => Err(ScriptStoreError::Command(format!(
                "token bucket expects 1 key and 3 args, got {} keys and {} args",
                keys.len(),
                args.len()
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_distributed(&self) -> bool {
        false
    }
}
