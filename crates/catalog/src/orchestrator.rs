//! Lookup planning and execution for one suggestion round.
//!
//! The orchestrator owns the only suspension point in the engine. Per
//! context it computes the minimal lookup set, serves what it can from
//! the cache, runs the rest concurrently under the gate with a
//! per-fetch timeout, and folds results into a [`RoundOutcome`] keyed
//! by field — arrival order never matters.

use crate::cache::CandidateCache;
use crate::client::CatalogClient;
use crate::error::{CatalogError, Result};
use crate::gate::FetchGate;
use assist_protocol::{CompleteRequest, CompleteResponse, ContextKind, LogsFacet, QueryContext};
use assist_suggest::Candidates;
use log::{debug, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Datasets a round can resolve. One field maps to one cache key shape
/// and one client endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupField {
    Metrics,
    TagPairs,
    TagValues,
    Services,
    Sources,
    Levels,
    Fields,
    Hosts,
    Envs,
}

impl fmt::Display for LookupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LookupField::Metrics => "metrics",
            LookupField::TagPairs => "tag-pairs",
            LookupField::TagValues => "tag-values",
            LookupField::Services => "services",
            LookupField::Sources => "sources",
            LookupField::Levels => "levels",
            LookupField::Fields => "fields",
            LookupField::Hosts => "hosts",
            LookupField::Envs => "envs",
        };
        f.write_str(name)
    }
}

/// A lookup that degraded; the matching candidate set stays empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    pub field: LookupField,
    pub error: CatalogError,
}

/// Everything one round resolved, partial failures included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub candidates: Candidates,
    pub failures: Vec<LookupFailure>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub max_in_flight: usize,
    pub fetch_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: CandidateCache::DEFAULT_TTL,
            cache_capacity: CandidateCache::DEFAULT_CAPACITY,
            max_in_flight: FetchGate::DEFAULT_CEILING,
            fetch_timeout: Duration::from_secs(2),
        }
    }
}

pub struct Orchestrator {
    client: Arc<dyn CatalogClient>,
    cache: Arc<CandidateCache>,
    gate: Arc<FetchGate>,
    fetch_timeout: Duration,
    /// Latched after an `Unauthorized` answer; cleared by `retry_auth`.
    auth_blocked: AtomicBool,
}

impl Orchestrator {
    #[must_use]
    pub fn new(client: Arc<dyn CatalogClient>, config: OrchestratorConfig) -> Self {
        Self::with_parts(
            client,
            Arc::new(CandidateCache::new(config.cache_ttl, config.cache_capacity)),
            Arc::new(FetchGate::new(config.max_in_flight)),
            config.fetch_timeout,
        )
    }

    /// Construct over an existing cache and gate — for sharing them
    /// across orchestrators, or injecting a manual clock in tests.
    #[must_use]
    pub fn with_parts(
        client: Arc<dyn CatalogClient>,
        cache: Arc<CandidateCache>,
        gate: Arc<FetchGate>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            gate,
            fetch_timeout,
            auth_blocked: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    #[must_use]
    pub fn auth_blocked(&self) -> bool {
        self.auth_blocked.load(Ordering::SeqCst)
    }

    /// Allow network fetches again after fixed credentials.
    pub fn retry_auth(&self) {
        self.auth_blocked.store(false, Ordering::SeqCst);
    }

    /// Resolve every candidate set the context needs.
    ///
    /// `Err` only on `Unauthorized` — anything else degrades the
    /// affected field and lands in `RoundOutcome::failures`.
    pub async fn candidates_for(&self, ctx: &QueryContext) -> Result<RoundOutcome> {
        if self.auth_blocked() {
            return Err(CatalogError::Unauthorized);
        }

        let mut outcome = RoundOutcome::default();
        let mut join = JoinSet::new();
        for spec in plan(ctx) {
            join.spawn(run_lookup(
                self.client.clone(),
                self.cache.clone(),
                self.gate.clone(),
                self.fetch_timeout,
                spec,
            ));
        }

        while let Some(joined) = join.join_next().await {
            let Ok((field, result)) = joined else {
                warn!("lookup task aborted");
                continue;
            };
            match result {
                Ok(values) => assign(&mut outcome.candidates, field, values),
                Err(CatalogError::Unauthorized) => {
                    self.flag_unauthorized();
                    return Err(CatalogError::Unauthorized);
                }
                Err(error) => {
                    warn!("lookup {field} degraded: {error}");
                    outcome.failures.push(LookupFailure { field, error });
                }
            }
        }

        self.degrade_tag_values(ctx, &mut outcome).await?;
        let stats = self.cache.stats();
        debug!("cache {} hits / {} misses", stats.hits, stats.misses);
        Ok(outcome)
    }

    /// Server-side replacement computation, when the host's catalog
    /// offers one. Subject to the same gate and timeout as lookups.
    pub async fn complete(&self, request: &CompleteRequest) -> Result<CompleteResponse> {
        if self.auth_blocked() {
            return Err(CatalogError::Unauthorized);
        }
        let permit = self.gate.acquire().await;
        let result = tokio::time::timeout(self.fetch_timeout, self.client.complete(request)).await;
        drop(permit);
        match result {
            Err(_) => Err(CatalogError::Timeout(self.fetch_timeout)),
            Ok(Err(CatalogError::Unauthorized)) => {
                self.flag_unauthorized();
                Err(CatalogError::Unauthorized)
            }
            Ok(other) => other,
        }
    }

    fn flag_unauthorized(&self) {
        warn!("catalog rejected credentials; suspending fetches until retry");
        self.auth_blocked.store(true, Ordering::SeqCst);
    }

    /// `NotFound` on tag values means the scoped endpoint is missing on
    /// this backend. Recover the values from the broader tag-pair list
    /// instead of leaving the field empty.
    async fn degrade_tag_values(
        &self,
        ctx: &QueryContext,
        outcome: &mut RoundOutcome,
    ) -> Result<()> {
        let Some(pos) = outcome.failures.iter().position(|f| {
            f.field == LookupField::TagValues && matches!(f.error, CatalogError::NotFound(_))
        }) else {
            return Ok(());
        };
        let (Some(metric), Some(tag_key)) = (&ctx.metric_name, &ctx.tag_key) else {
            return Ok(());
        };

        let spec = LookupSpec {
            field: LookupField::TagPairs,
            metric: Some(metric.clone()),
            tag_key: None,
        };
        let (_, result) = run_lookup(
            self.client.clone(),
            self.cache.clone(),
            self.gate.clone(),
            self.fetch_timeout,
            spec,
        )
        .await;
        match result {
            Ok(pairs) => {
                let prefix = format!("{tag_key}:");
                outcome.candidates.tag_values = pairs
                    .iter()
                    .filter_map(|pair| pair.strip_prefix(&prefix))
                    .map(str::to_string)
                    .collect();
                outcome.failures.remove(pos);
                debug!("tag values for `{tag_key}` recovered from tag pairs");
                Ok(())
            }
            Err(CatalogError::Unauthorized) => {
                self.flag_unauthorized();
                Err(CatalogError::Unauthorized)
            }
            Err(error) => {
                warn!("tag-pair fallback degraded: {error}");
                Ok(())
            }
        }
    }
}

struct LookupSpec {
    field: LookupField,
    metric: Option<String>,
    tag_key: Option<String>,
}

impl LookupSpec {
    fn cache_key(&self) -> String {
        let metric = self.metric.as_deref().unwrap_or_default();
        match self.field {
            LookupField::Metrics => "metrics".to_string(),
            LookupField::TagPairs => format!("tags/{metric}"),
            LookupField::TagValues => format!(
                "tag-values/{metric}/{}",
                self.tag_key.as_deref().unwrap_or_default()
            ),
            LookupField::Services => "logs/services".to_string(),
            LookupField::Sources => "logs/sources".to_string(),
            LookupField::Levels => "logs/levels".to_string(),
            LookupField::Fields => "logs/fields".to_string(),
            LookupField::Hosts => "logs/field-values/host".to_string(),
            LookupField::Envs => "logs/field-values/env".to_string(),
        }
    }
}

/// The minimal lookup set for a context.
fn plan(ctx: &QueryContext) -> Vec<LookupSpec> {
    let spec = |field| LookupSpec {
        field,
        metric: ctx.metric_name.clone(),
        tag_key: ctx.tag_key.clone(),
    };
    match ctx.kind {
        ContextKind::MetricName => vec![spec(LookupField::Metrics)],
        // The aggregator vocabulary is static; nothing to fetch.
        ContextKind::AggregatorPrefix => vec![],
        ContextKind::FilterTagKey | ContextKind::GroupingTag => {
            if ctx.metric_name.is_some() {
                vec![spec(LookupField::TagPairs)]
            } else {
                vec![]
            }
        }
        ContextKind::FilterTagValue => {
            if ctx.metric_name.is_some() && ctx.tag_key.is_some() {
                vec![spec(LookupField::TagValues)]
            } else {
                vec![]
            }
        }
        ContextKind::LogsFacetValue(LogsFacet::Service) => vec![spec(LookupField::Services)],
        ContextKind::LogsFacetValue(LogsFacet::Source) => vec![spec(LookupField::Sources)],
        ContextKind::LogsFacetValue(LogsFacet::Level) => vec![spec(LookupField::Levels)],
        ContextKind::LogsFacetValue(LogsFacet::Host) => vec![spec(LookupField::Hosts)],
        ContextKind::LogsFacetValue(LogsFacet::Env) => vec![spec(LookupField::Envs)],
        // Field names feed the suggestions; the list endpoints warm the
        // cache for the facet-value round that usually follows.
        ContextKind::LogsSearch | ContextKind::LogsFacetName => vec![
            spec(LookupField::Fields),
            spec(LookupField::Services),
            spec(LookupField::Sources),
            spec(LookupField::Levels),
        ],
    }
}

async fn run_lookup(
    client: Arc<dyn CatalogClient>,
    cache: Arc<CandidateCache>,
    gate: Arc<FetchGate>,
    fetch_timeout: Duration,
    spec: LookupSpec,
) -> (LookupField, Result<Vec<String>>) {
    let key = spec.cache_key();
    if let Some(values) = cache.get(&key) {
        debug!("lookup {} served from cache", spec.field);
        return (spec.field, Ok(values));
    }

    let permit = gate.acquire().await;
    let result = tokio::time::timeout(fetch_timeout, call(client.as_ref(), &spec)).await;
    drop(permit);

    let result = match result {
        Err(_) => Err(CatalogError::Timeout(fetch_timeout)),
        Ok(Ok(values)) => {
            cache.insert(key, values.clone());
            Ok(values)
        }
        Ok(Err(error)) => Err(error),
    };
    (spec.field, result)
}

async fn call(client: &dyn CatalogClient, spec: &LookupSpec) -> Result<Vec<String>> {
    let metric = spec.metric.as_deref().unwrap_or_default();
    match spec.field {
        LookupField::Metrics => client.metrics().await,
        LookupField::TagPairs => client.tags(metric).await,
        LookupField::TagValues => {
            client
                .tag_values(metric, spec.tag_key.as_deref().unwrap_or_default())
                .await
        }
        LookupField::Services => client.logs_services().await,
        LookupField::Sources => client.logs_sources().await,
        LookupField::Levels => client.logs_levels().await,
        LookupField::Fields => client.logs_fields().await,
        LookupField::Hosts => client.logs_field_values("host").await,
        LookupField::Envs => client.logs_field_values("env").await,
    }
}

fn assign(candidates: &mut Candidates, field: LookupField, values: Vec<String>) {
    match field {
        LookupField::Metrics => candidates.metrics = values,
        LookupField::TagPairs => candidates.tag_pairs = values,
        LookupField::TagValues => candidates.tag_values = values,
        LookupField::Services => candidates.services = values,
        LookupField::Sources => candidates.sources = values,
        LookupField::Levels => candidates.levels = values,
        LookupField::Fields => candidates.fields = values,
        LookupField::Hosts => candidates.hosts = values,
        LookupField::Envs => candidates.envs = values,
    }
}
