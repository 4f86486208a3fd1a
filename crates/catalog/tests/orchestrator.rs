//! Orchestrator behavior against a scriptable mock catalog: cache
//! reuse, concurrency bounding, per-field degradation, and the
//! unauthorized latch.

use assist_catalog::{
    CandidateCache, CatalogClient, CatalogError, Clock, FetchGate, LookupField, Orchestrator,
    Result,
};
use assist_protocol::{ContextKind, QueryContext};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct ManualClock(AtomicU64);

impl ManualClock {
    fn advance(&self, d: Duration) {
        self.0
            .fetch_add(u64::try_from(d.as_millis()).unwrap(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scriptable catalog double: per-endpoint call counts, injected
/// latency, injected errors, and in-flight accounting.
#[derive(Default)]
struct MockClient {
    calls: Mutex<HashMap<&'static str, usize>>,
    slow: Mutex<HashMap<&'static str, Duration>>,
    errors: Mutex<HashMap<&'static str, CatalogError>>,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl MockClient {
    fn calls(&self, endpoint: &str) -> usize {
        *self.calls.lock().unwrap().get(endpoint).unwrap_or(&0)
    }

    fn set_slow(&self, endpoint: &'static str, delay: Duration) {
        self.slow.lock().unwrap().insert(endpoint, delay);
    }

    fn set_error(&self, endpoint: &'static str, error: CatalogError) {
        self.errors.lock().unwrap().insert(endpoint, error);
    }

    fn clear_error(&self, endpoint: &str) {
        self.errors.lock().unwrap().remove(endpoint);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn respond(&self, endpoint: &'static str, values: &[&str]) -> Result<Vec<String>> {
        *self.calls.lock().unwrap().entry(endpoint).or_insert(0) += 1;
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .slow
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;
        self.current.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.errors.lock().unwrap().get(endpoint).cloned() {
            return Err(error);
        }
        Ok(values.iter().map(|v| v.to_string()).collect())
    }
}

#[async_trait]
impl CatalogClient for MockClient {
    async fn metrics(&self) -> Result<Vec<String>> {
        self.respond("metrics", &["system.cpu.user", "system.mem.free"])
            .await
    }

    async fn tags(&self, _metric: &str) -> Result<Vec<String>> {
        self.respond("tags", &["host:web-1", "host:web-2", "env:prod"])
            .await
    }

    async fn tag_values(&self, _metric: &str, _tag_key: &str) -> Result<Vec<String>> {
        self.respond("tag_values", &["web-1", "web-2"]).await
    }

    async fn logs_services(&self) -> Result<Vec<String>> {
        self.respond("services", &["web-app", "api"]).await
    }

    async fn logs_sources(&self) -> Result<Vec<String>> {
        self.respond("sources", &["nginx", "postgres"]).await
    }

    async fn logs_levels(&self) -> Result<Vec<String>> {
        self.respond("levels", &["INFO", "WARN", "ERROR"]).await
    }

    async fn logs_fields(&self) -> Result<Vec<String>> {
        self.respond("fields", &["service", "status", "team"]).await
    }

    async fn logs_field_values(&self, _field: &str) -> Result<Vec<String>> {
        self.respond("field_values", &["val-1", "val-2"]).await
    }
}

fn orchestrator_with(
    client: Arc<MockClient>,
    clock: Arc<ManualClock>,
    ceiling: usize,
    fetch_timeout: Duration,
) -> Orchestrator {
    let cache = Arc::new(CandidateCache::with_clock(
        Duration::from_secs(30),
        64,
        clock,
    ));
    Orchestrator::with_parts(client, cache, Arc::new(FetchGate::new(ceiling)), fetch_timeout)
}

fn metric_ctx() -> QueryContext {
    QueryContext::new(ContextKind::MetricName, "sys", 3).token("sys")
}

fn logs_ctx() -> QueryContext {
    QueryContext::new(ContextKind::LogsSearch, "", 0)
}

#[tokio::test]
async fn repeated_lookups_within_ttl_fetch_once_and_refetch_after_expiry() {
    let client = Arc::new(MockClient::default());
    let clock = Arc::new(ManualClock::default());
    let orch = orchestrator_with(client.clone(), clock.clone(), 5, Duration::from_secs(2));

    orch.candidates_for(&metric_ctx()).await.unwrap();
    orch.candidates_for(&metric_ctx()).await.unwrap();
    assert_eq!(client.calls("metrics"), 1);

    clock.advance(Duration::from_secs(31));
    orch.candidates_for(&metric_ctx()).await.unwrap();
    assert_eq!(client.calls("metrics"), 2);
}

#[tokio::test]
async fn fan_out_respects_the_concurrency_ceiling() {
    let client = Arc::new(MockClient::default());
    for endpoint in ["fields", "services", "sources", "levels"] {
        client.set_slow(endpoint, Duration::from_millis(40));
    }
    let clock = Arc::new(ManualClock::default());
    let orch = orchestrator_with(client.clone(), clock, 2, Duration::from_secs(2));

    let outcome = orch.candidates_for(&logs_ctx()).await.unwrap();

    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.candidates.fields, vec!["service", "status", "team"]);
    assert_eq!(outcome.candidates.levels, vec!["INFO", "WARN", "ERROR"]);
    for endpoint in ["fields", "services", "sources", "levels"] {
        assert_eq!(client.calls(endpoint), 1);
    }
    assert!(client.peak() <= 2, "peak in-flight was {}", client.peak());
}

#[tokio::test]
async fn timeout_degrades_only_the_slow_field() {
    let client = Arc::new(MockClient::default());
    client.set_slow("services", Duration::from_millis(500));
    let clock = Arc::new(ManualClock::default());
    let orch = orchestrator_with(client.clone(), clock, 5, Duration::from_millis(50));

    let outcome = orch.candidates_for(&logs_ctx()).await.unwrap();

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].field, LookupField::Services);
    assert!(matches!(
        outcome.failures[0].error,
        CatalogError::Timeout(_)
    ));
    assert!(outcome.candidates.services.is_empty());
    assert_eq!(outcome.candidates.sources, vec!["nginx", "postgres"]);
}

#[tokio::test]
async fn network_failure_in_one_field_leaves_siblings_intact() {
    let client = Arc::new(MockClient::default());
    client.set_error("sources", CatalogError::Network("connection reset".into()));
    let clock = Arc::new(ManualClock::default());
    let orch = orchestrator_with(client.clone(), clock, 5, Duration::from_secs(2));

    let outcome = orch.candidates_for(&logs_ctx()).await.unwrap();

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].field, LookupField::Sources);
    assert!(outcome.candidates.sources.is_empty());
    assert!(!outcome.candidates.fields.is_empty());
    assert!(!outcome.candidates.levels.is_empty());
}

#[tokio::test]
async fn unauthorized_latches_until_retried() {
    let client = Arc::new(MockClient::default());
    client.set_error("metrics", CatalogError::Unauthorized);
    let clock = Arc::new(ManualClock::default());
    let orch = orchestrator_with(client.clone(), clock, 5, Duration::from_secs(2));

    assert_eq!(
        orch.candidates_for(&metric_ctx()).await,
        Err(CatalogError::Unauthorized)
    );
    assert!(orch.auth_blocked());

    // Latched: no further network traffic.
    assert_eq!(
        orch.candidates_for(&metric_ctx()).await,
        Err(CatalogError::Unauthorized)
    );
    assert_eq!(client.calls("metrics"), 1);

    client.clear_error("metrics");
    orch.retry_auth();
    let outcome = orch.candidates_for(&metric_ctx()).await.unwrap();
    assert_eq!(
        outcome.candidates.metrics,
        vec!["system.cpu.user", "system.mem.free"]
    );
    assert_eq!(client.calls("metrics"), 2);
}

#[tokio::test]
async fn missing_tag_value_endpoint_falls_back_to_tag_pairs() {
    let client = Arc::new(MockClient::default());
    client.set_error(
        "tag_values",
        CatalogError::NotFound("tag values unavailable".into()),
    );
    let clock = Arc::new(ManualClock::default());
    let orch = orchestrator_with(client.clone(), clock, 5, Duration::from_secs(2));

    let ctx = QueryContext::new(ContextKind::FilterTagValue, "system.cpu.user{host:", 21)
        .metric("system.cpu.user")
        .tag("host");
    let outcome = orch.candidates_for(&ctx).await.unwrap();

    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.candidates.tag_values, vec!["web-1", "web-2"]);
    assert_eq!(client.calls("tags"), 1);
}

#[tokio::test]
async fn aggregator_context_needs_no_lookups() {
    let client = Arc::new(MockClient::default());
    let clock = Arc::new(ManualClock::default());
    let orch = orchestrator_with(client.clone(), clock, 5, Duration::from_secs(2));

    let ctx = QueryContext::new(ContextKind::AggregatorPrefix, "a", 1).token("a");
    let outcome = orch.candidates_for(&ctx).await.unwrap();

    assert_eq!(outcome, assist_catalog::RoundOutcome::default());
    assert!(client.calls.lock().unwrap().is_empty());
}
