//! # Gateway Resilience
//!
//! Admission control for the LLM Gatekeeper:
//! - Token bucket rate limiting shared across gateway processes
//! - A single store-side script per decision, preloaded once per process
//! - Redis and in-process script stores
//! - Explicit fail-open / fail-closed handling of store outages

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admission;
pub mod memory_store;
pub mod redis_store;
pub mod store;

// Re-export main types
pub use admission::{AdmissionController, FailurePolicy, LimiterOptions};
pub use memory_store::{ManualClock, MemoryScriptStore, StoreClock, SystemClock};
pub use redis_store::RedisScriptStore;
pub use store::{BucketState, ScriptStore, ScriptStoreError, StoreResult, TOKEN_BUCKET_SCRIPT};
