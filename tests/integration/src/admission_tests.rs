//! Admission control integration tests
//!
//! Token bucket behaviour through `AdmissionController` over the in-memory
//! script store, plus startup against an unreachable Redis.

use crate::helpers::*;
use gateway_resilience::{AdmissionController, FailurePolicy, LimiterOptions, RedisScriptStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// A fresh bucket holds exactly `capacity` tokens
#[tokio::test]
async fn test_fresh_bucket_grants_full_capacity_at_once() {
    let (_clock, store) = memory_store();
    let controller = AdmissionController::new(store).await;
    let options = LimiterOptions::new().with_capacity(10);

    assert!(controller
        .allow("k", &options.with_requested(10))
        .await
        .expect("decision"));
    assert!(!controller
        .allow("k", &options.with_requested(1))
        .await
        .expect("decision"));
}

/// Capacity consecutive requests succeed, the next one is denied
#[tokio::test]
async fn test_consecutive_requests_drain_bucket() {
    let (_clock, store) = memory_store();
    let controller = AdmissionController::new(store).await;
    let options = LimiterOptions::new().with_capacity(7).with_rate(1);

    let mut decisions = Vec::new();
    for _ in 0..8 {
        decisions.push(controller.allow("k", &options).await.expect("decision"));
    }

    assert_eq!(decisions, [true, true, true, true, true, true, true, false]);
}

/// Refill is proportional to elapsed store time and capped at capacity
#[tokio::test]
async fn test_refill_and_cap() {
    let (clock, store) = memory_store();
    let controller = AdmissionController::new(store.clone()).await;
    let options = LimiterOptions::new().with_capacity(10).with_rate(1);

    assert!(controller
        .allow("k", &options.with_requested(10))
        .await
        .expect("decision"));
    assert!(!controller.allow("k", &options).await.expect("decision"));

    clock.advance(1);
    assert!(controller.allow("k", &options).await.expect("decision"));

    clock.advance(3_600);
    assert!(controller.allow("k", &options).await.expect("decision"));
    let bucket = store.bucket("k").expect("bucket exists");
    assert!((bucket.tokens - 9.0).abs() < f64::EPSILON);
}

/// Keys are independent buckets
#[tokio::test]
async fn test_keys_are_isolated() {
    let (_clock, store) = memory_store();
    let controller = AdmissionController::new(store).await;
    let options = LimiterOptions::new().with_capacity(1);

    assert!(controller.allow("tenant-a", &options).await.expect("decision"));
    assert!(controller.allow("tenant-b", &options).await.expect("decision"));
    assert!(!controller.allow("tenant-a", &options).await.expect("decision"));
}

/// Two controllers over one store share buckets, as gateway processes over one Redis do
#[tokio::test]
async fn test_controllers_share_store_state() {
    let (_clock, store) = memory_store();
    let first = AdmissionController::new(store.clone()).await;
    let second = AdmissionController::new(store).await;
    let options = LimiterOptions::new().with_capacity(2);

    assert!(first.allow("k", &options).await.expect("decision"));
    assert!(second.allow("k", &options).await.expect("decision"));
    assert!(!first.allow("k", &options).await.expect("decision"));
    assert!(!second.allow("k", &options).await.expect("decision"));
}

/// Startup against an unreachable Redis logs and continues; every call then fails
#[tokio::test]
async fn test_unreachable_redis_at_startup() {
    let store = RedisScriptStore::new("redis://127.0.0.1:1").expect("valid url");
    let controller = AdmissionController::new(Arc::new(store)).await;

    assert!(!controller.is_ready());
    for _ in 0..3 {
        let err = controller
            .allow("k", &LimiterOptions::default())
            .await
            .expect_err("no script handle");
        assert_eq!(err.error_code(), "rate_limit_backend_error");
    }

    assert!(controller
        .allow_or("k", &LimiterOptions::default(), FailurePolicy::FailOpen)
        .await);
    assert!(!controller
        .allow_or("k", &LimiterOptions::default(), FailurePolicy::FailClosed)
        .await);
}
