//! Redis script store integration tests
//!
//! All tests require a running Redis instance (`REDIS_URL`, default
//! `redis://localhost:6379`) and are ignored by default.

use crate::helpers::*;
use gateway_resilience::store::{script_sha, LAST_TIME_FIELD, TOKENS_FIELD};
use gateway_resilience::{LimiterOptions, RedisScriptStore, ScriptStore, TOKEN_BUCKET_SCRIPT};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

async fn connection() -> redis::aio::MultiplexedConnection {
    let client = redis::Client::open(redis_url()).expect("Failed to create Redis client");
    client
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis")
}

async fn bucket_fields(key: &str) -> (Option<String>, Option<String>) {
    let mut conn = connection().await;
    redis::cmd("HMGET")
        .arg(key)
        .arg(TOKENS_FIELD)
        .arg(LAST_TIME_FIELD)
        .query_async(&mut conn)
        .await
        .expect("HMGET failed")
}

async fn delete(key: &str) {
    let mut conn = connection().await;
    let _: () = redis::cmd("DEL")
        .arg(key)
        .query_async(&mut conn)
        .await
        .expect("DEL failed");
}

/// The preloaded hash is the content hash of the script source
#[tokio::test]
#[ignore] // Requires Redis
async fn test_preload_registers_script() {
    let _guard = redis_guard().await;
    let controller = redis_controller(None).await;

    assert!(controller.is_ready());
    assert_eq!(controller.script_sha(), Some(script_sha(TOKEN_BUCKET_SCRIPT).as_str()));

    let mut conn = connection().await;
    let exists: Vec<i64> = redis::cmd("SCRIPT")
        .arg("EXISTS")
        .arg(script_sha(TOKEN_BUCKET_SCRIPT))
        .query_async(&mut conn)
        .await
        .expect("SCRIPT EXISTS failed");
    assert_eq!(exists, vec![1]);
}

/// Capacity consecutive admits, then denial; state lives in the bucket hash
#[tokio::test]
#[ignore] // Requires Redis
async fn test_bucket_drain_and_record() {
    let _guard = redis_guard().await;
    let controller = redis_controller(None).await;
    let key = unique_key("gatekeeper:test:drain");
    let options = LimiterOptions::new().with_capacity(5).with_rate(0);

    for i in 0..5 {
        assert!(controller.allow(&key, &options).await.expect("decision"), "request {i}");
    }
    assert!(!controller.allow(&key, &options).await.expect("decision"));

    let (tokens, last_time) = bucket_fields(&key).await;
    let tokens: f64 = tokens.expect("tokens field").parse().expect("numeric tokens");
    assert!(tokens.abs() < f64::EPSILON);
    assert!(last_time.expect("last_time field").parse::<u64>().is_ok());

    delete(&key).await;
}

/// Key prefix namespaces the stored record
#[tokio::test]
#[ignore] // Requires Redis
async fn test_key_prefix_in_store() {
    let _guard = redis_guard().await;
    let controller = redis_controller(Some("gatekeeper-test")).await;
    let key = unique_key("tenant");

    assert!(controller
        .allow(&key, &LimiterOptions::default())
        .await
        .expect("decision"));

    let stored = format!("gatekeeper-test:{key}");
    let (tokens, _) = bucket_fields(&stored).await;
    assert_eq!(tokens.as_deref(), Some("9"));
    let (unprefixed, _) = bucket_fields(&key).await;
    assert!(unprefixed.is_none());

    delete(&stored).await;
}

/// Elapsed store time refills the bucket
#[tokio::test]
#[ignore] // Requires Redis
async fn test_refill_after_store_time_passes() {
    let _guard = redis_guard().await;
    let controller = redis_controller(None).await;
    let key = unique_key("gatekeeper:test:refill");
    // Draining two tokens at one per second: a second boundary between the
    // two calls refills at most one token, which is still not enough
    let options = LimiterOptions::new()
        .with_capacity(2)
        .with_rate(1)
        .with_requested(2);

    assert!(controller.allow(&key, &options).await.expect("decision"));
    assert!(!controller.allow(&key, &options).await.expect("decision"));

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert!(controller.allow(&key, &options).await.expect("decision"));

    delete(&key).await;
}

/// N concurrent requests on a bucket holding N tokens admit exactly N,
/// even when spread across several controllers
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore] // Requires Redis
async fn test_concurrent_admission_is_exact() {
    let _guard = redis_guard().await;
    let key = unique_key("gatekeeper:test:concurrent");
    let capacity = 40;
    let options = LimiterOptions::new().with_capacity(capacity).with_rate(0);

    let mut controllers = Vec::new();
    for _ in 0..4 {
        controllers.push(Arc::new(redis_controller(None).await));
    }

    let tasks: Vec<_> = (0..capacity * 3)
        .map(|i| {
            let controller = controllers[i as usize % controllers.len()].clone();
            let key = key.clone();
            tokio::spawn(async move { controller.allow(&key, &options).await })
        })
        .collect();

    let admitted = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task").expect("decision"))
        .filter(|allowed| *allowed)
        .count();

    assert_eq!(admitted, capacity as usize);
    delete(&key).await;
}

/// A flushed script is reported on every call and never re-registered
#[tokio::test]
#[ignore] // Requires Redis
async fn test_flushed_script_is_not_reloaded() {
    let _guard = redis_guard().await;
    let controller = redis_controller(None).await;
    let key = unique_key("gatekeeper:test:flush");
    assert!(controller
        .allow(&key, &LimiterOptions::default())
        .await
        .expect("decision"));

    let mut conn = connection().await;
    let _: () = redis::cmd("SCRIPT")
        .arg("FLUSH")
        .query_async(&mut conn)
        .await
        .expect("SCRIPT FLUSH failed");

    for _ in 0..2 {
        let err = controller
            .allow(&key, &LimiterOptions::default())
            .await
            .expect_err("script flushed");
        assert_eq!(err.error_code(), "rate_limit_backend_error");
    }

    let exists: Vec<i64> = redis::cmd("SCRIPT")
        .arg("EXISTS")
        .arg(script_sha(TOKEN_BUCKET_SCRIPT))
        .query_async(&mut conn)
        .await
        .expect("SCRIPT EXISTS failed");
    assert_eq!(exists, vec![0]);

    delete(&key).await;
}

/// The store-level EVALSHA contract: KEYS[1] plus requested, rate, capacity
#[tokio::test]
#[ignore] // Requires Redis
async fn test_evalsha_contract() {
    let _guard = redis_guard().await;
    let store = RedisScriptStore::new(redis_url()).expect("store");
    store.health_check().await.expect("Redis reachable");
    let sha = store.script_load(TOKEN_BUCKET_SCRIPT).await.expect("SCRIPT LOAD");
    let key = unique_key("gatekeeper:test:contract");

    // Rate zero: no refill between the calls whatever the store clock does
    assert_eq!(store.eval_sha(&sha, &[key.as_str()], &[3, 0, 3]).await.expect("EVALSHA"), 1);
    assert_eq!(store.eval_sha(&sha, &[key.as_str()], &[1, 0, 3]).await.expect("EVALSHA"), 0);

    let unknown = "0".repeat(40);
    assert!(store.eval_sha(&unknown, &[key.as_str()], &[1, 0, 3]).await.is_err());

    delete(&key).await;
}
