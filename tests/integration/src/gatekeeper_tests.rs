//! Gatekeeper facade integration tests
//!
//! Configuration loading, hot reload and metrics around full gatekeeping
//! decisions.

use crate::helpers::*;
use gateway_config::{reload, ConfigLoader, GatekeeperConfig, SharedConfig, StoreBackend};
use gateway_core::RequestContext;
use gateway_resilience::FailurePolicy;
use gateway_telemetry::{AdmissionOutcome, MappingStatus};
use llm_gatekeeper::{Decision, Gatekeeper};
use pretty_assertions::assert_eq;
use std::io::Write;

async fn decide(gatekeeper: &Gatekeeper, key: &str, model: &str) -> (Decision, RequestContext) {
    let mut ctx = RequestContext::new(model);
    let decision = gatekeeper.check(key, &mut ctx).await.expect("decision");
    (decision, ctx)
}

/// Admitted requests carry the resolved upstream model
#[tokio::test]
async fn test_full_decision_flow() {
    let t = TestGatekeeper::with(3, r#"{"gpt-4":"gpt-4o"}"#).await;

    let mut decisions = Vec::new();
    for _ in 0..4 {
        let (decision, ctx) = decide(&t.gatekeeper, "tenant", "gpt-4").await;
        decisions.push((decision, ctx.upstream_model_name().to_string()));
    }

    assert_eq!(
        decisions,
        vec![
            (Decision::Admitted, "gpt-4o".to_string()),
            (Decision::Admitted, "gpt-4o".to_string()),
            (Decision::Admitted, "gpt-4o".to_string()),
            (Decision::RateLimited, "gpt-4".to_string()),
        ]
    );
    assert_eq!(t.metrics.admission_count(AdmissionOutcome::Allowed), 3);
    assert_eq!(t.metrics.admission_count(AdmissionOutcome::Denied), 1);
    assert_eq!(t.metrics.mapping_count(MappingStatus::Mapped), 3);
}

/// Denied requests are admitted again once the store clock moves on
#[tokio::test]
async fn test_rate_limited_then_refilled() {
    let t = TestGatekeeper::with(1, "").await;

    assert_eq!(decide(&t.gatekeeper, "tenant", "m").await.0, Decision::Admitted);
    assert_eq!(decide(&t.gatekeeper, "tenant", "m").await.0, Decision::RateLimited);

    t.clock.advance(1);
    assert_eq!(decide(&t.gatekeeper, "tenant", "m").await.0, Decision::Admitted);
}

/// A reloaded config file changes limits and aliases for later requests only
#[tokio::test]
async fn test_reload_from_file() {
    let t = TestGatekeeper::with(10, r#"{"m":"v1"}"#).await;
    let (_, before) = decide(&t.gatekeeper, "tenant", "m").await;

    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("temp file");
    file.write_all(
        br#"
store:
  backend: memory
rate_limit:
  capacity: 10
model_mapping: '{"m":"v2"}'
"#,
    )
    .expect("write config");

    let loader = ConfigLoader::new().with_file(file.path()).without_env();
    reload(&loader, t.gatekeeper.config()).await.expect("reload");

    let (_, after) = decide(&t.gatekeeper, "tenant", "m").await;
    assert_eq!(before.upstream_model_name(), "v1");
    assert_eq!(after.upstream_model_name(), "v2");
    assert_eq!(t.gatekeeper.config().snapshot().store.backend, StoreBackend::Memory);
}

/// A broken alias table rejects requests until it is fixed
#[tokio::test]
async fn test_broken_mapping_rejects_until_fixed() {
    let t = TestGatekeeper::with(10, r#"{"a":"b","b":"a"}"#).await;

    let mut ctx = RequestContext::new("a");
    let err = t.gatekeeper.check("tenant", &mut ctx).await.expect_err("cycle");
    assert!(err.is_mapping_error());
    assert_eq!(ctx.upstream_model_name(), "a");

    t.gatekeeper.config().set_model_mapping(r#"{"a":"b"}"#);
    let (decision, ctx) = decide(&t.gatekeeper, "tenant", "a").await;
    assert_eq!(decision, Decision::Admitted);
    assert_eq!(ctx.upstream_model_name(), "b");
    assert_eq!(t.metrics.mapping_count(MappingStatus::CycleError), 1);
}

/// A store that lost its script fails every call; the failure policy decides
#[tokio::test]
async fn test_store_restart_requires_process_restart() {
    let t = TestGatekeeper::with(10, "").await;
    assert_eq!(decide(&t.gatekeeper, "tenant", "m").await.0, Decision::Admitted);

    t.store.flush_scripts();

    for _ in 0..3 {
        let mut ctx = RequestContext::new("m");
        let err = t.gatekeeper.check("tenant", &mut ctx).await.expect_err("no script");
        assert!(err.is_admission_error());
    }
    assert_eq!(t.metrics.admission_count(AdmissionOutcome::Error), 3);

    let mut ctx = RequestContext::new("m");
    let decision = t
        .gatekeeper
        .check_or("tenant", &mut ctx, FailurePolicy::FailClosed)
        .await
        .expect("policy applied");
    assert_eq!(decision, Decision::RateLimited);

    // A new gatekeeper (process restart) preloads again
    let restarted = TestGatekeeper::with(10, "").await;
    assert!(restarted.gatekeeper.admission().is_ready());
}

/// Concurrent requests against one key admit exactly the bucket capacity
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_admit_capacity() {
    let mut config = GatekeeperConfig::default();
    config.rate_limit.capacity = 25;
    config.rate_limit.rate = 0;
    let t = TestGatekeeper::new(config).await;

    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let gatekeeper = t.gatekeeper.clone();
            tokio::spawn(async move { decide(&gatekeeper, "shared", "m").await.0 })
        })
        .collect();

    let decisions = futures::future::join_all(tasks).await;
    let admitted = decisions
        .into_iter()
        .map(|r| r.expect("task"))
        .filter(|d| *d == Decision::Admitted)
        .count();

    assert_eq!(admitted, 25);
}

/// Prometheus exposition carries both counters
#[tokio::test]
async fn test_metrics_exposition() {
    let t = TestGatekeeper::with(1, r#"{"m":"n"}"#).await;
    decide(&t.gatekeeper, "tenant", "m").await;
    decide(&t.gatekeeper, "tenant", "m").await;

    let text = t.metrics.encode_text().expect("encode");
    assert!(text.contains(r#"gatekeeper_admission_decisions_total{outcome="allowed"} 1"#));
    assert!(text.contains(r#"gatekeeper_admission_decisions_total{outcome="denied"} 1"#));
    assert!(text.contains(r#"gatekeeper_model_mapping_total{outcome="mapped"} 1"#));
}

/// Building from configuration with the memory backend and a key prefix
#[tokio::test]
async fn test_from_config_with_prefix() {
    let mut config = GatekeeperConfig::default();
    config.store.backend = StoreBackend::Memory;
    config.store.key_prefix = Some("edge".to_string());
    config.rate_limit.capacity = 1;

    let gatekeeper = Gatekeeper::from_config(SharedConfig::new(config))
        .await
        .expect("gatekeeper");

    assert_eq!(decide(&gatekeeper, "tenant", "m").await.0, Decision::Admitted);
    assert_eq!(decide(&gatekeeper, "tenant", "m").await.0, Decision::RateLimited);
    assert_eq!(decide(&gatekeeper, "other", "m").await.0, Decision::Admitted);
}

/// Editing the watched file changes aliases for later requests
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_config_applies_file_edits() {
    let file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    std::fs::write(file.path(), "model_mapping = '{\"m\":\"v1\"}'\n").expect("write config");

    let t = TestGatekeeper::with(100, r#"{"m":"v1"}"#).await;
    let loader = ConfigLoader::new().with_file(file.path()).without_env();
    let _watcher = t.gatekeeper.watch_config(loader).expect("watch");

    std::fs::write(file.path(), "model_mapping = '{\"m\":\"v2\"}'\n").expect("rewrite config");

    for _ in 0..50 {
        if t.gatekeeper.config().snapshot().model_mapping.contains("v2") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    let (decision, ctx) = decide(&t.gatekeeper, "tenant", "m").await;
    assert_eq!(decision, Decision::Admitted);
    assert_eq!(ctx.upstream_model_name(), "v2");
}
