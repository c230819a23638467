//! Script-capable shared store abstraction.
//!
//! The admission controller only needs two operations from its backing store:
//! register a script once and invoke it by content hash. Keeping the surface
//! this small lets an in-process store stand in for Redis on single-instance
//! deployments and in tests.

use async_trait::async_trait;
use thiserror::Error;

/// Source of the token bucket refill-and-consume script
pub const TOKEN_BUCKET_SCRIPT: &str = include_str!("scripts/token_bucket.lua");

/// Hash field holding the current token count
pub const TOKENS_FIELD: &str = "tokens";

/// Hash field holding the last refill time in store seconds
pub const LAST_TIME_FIELD: &str = "last_time";

/// Error types for script store operations
#[derive(Debug, Error)]
pub enum ScriptStoreError {
    /// Could not reach the store
    #[error("Store connection error: {0}")]
    Connection(String),

    /// The store does not know the requested script hash
    #[error("Script not loaded: {0}")]
    NoScript(String),

    /// The store rejected the script source
    #[error("Unsupported script: {0}")]
    UnsupportedScript(String),

    /// Command execution failed
    #[error("Store command failed: {0}")]
    Command(String),
}

/// Result type for script store operations
pub type StoreResult<T> = Result<T, ScriptStoreError>;

/// Token bucket record as held by a store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketState {
    /// Tokens currently available
    pub tokens: f64,
    /// Store time of the last refill, in whole seconds
    pub last_refill_time: u64,
}

/// Store capable of executing server-side scripts atomically
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Register a script and return its content hash
    async fn script_load(&self, source: &str) -> StoreResult<String>;

    /// Invoke a previously registered script and return its integer reply
    async fn eval_sha(&self, sha: &str, keys: &[&str], args: &[i64]) -> StoreResult<i64>;

    /// Get backend name for logs
    fn name(&self) -> &'static str;

    /// Check if backend state is shared between processes
    fn is_distributed(&self) -> bool;
}

/// Content hash Redis assigns to a script source
#[must_use]
pub fn script_sha(source: &str) -> String {
    redis::Script::new(source).get_hash().to_string()
}
