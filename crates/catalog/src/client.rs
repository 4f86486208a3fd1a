//! The remote catalog interface and an in-process snapshot
//! implementation.

use crate::error::{CatalogError, Result};
use assist_protocol::{CompleteRequest, CompleteResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Remote catalog endpoints, transport left to the host. Every method
/// returns the candidate list for one dataset; scoping arguments mirror
/// the cache keys.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Metric names.
    async fn metrics(&self) -> Result<Vec<String>>;

    /// `"key:value"` tag pairs seen on a metric.
    async fn tags(&self, metric: &str) -> Result<Vec<String>>;

    /// Values of one tag key on a metric.
    async fn tag_values(&self, metric: &str, tag_key: &str) -> Result<Vec<String>>;

    async fn logs_services(&self) -> Result<Vec<String>>;

    async fn logs_sources(&self) -> Result<Vec<String>>;

    async fn logs_levels(&self) -> Result<Vec<String>>;

    /// Names of indexed log fields beyond the built-in facets.
    async fn logs_fields(&self) -> Result<Vec<String>>;

    /// Values of one indexed log field (`host`, `env`, ...).
    async fn logs_field_values(&self, field: &str) -> Result<Vec<String>>;

    /// Optional server-side replacement computation. The default is
    /// "unavailable", which makes callers fall back to the local
    /// algorithm.
    async fn complete(&self, request: &CompleteRequest) -> Result<CompleteResponse> {
        let _ = request;
        Err(CatalogError::NotFound("server-side completion".into()))
    }
}

/// Serialized catalog content for [`StaticCatalog`]: the JSON shape the
/// CLI consumes and tests construct inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Metric name → `"key:value"` pairs.
    #[serde(default)]
    pub tags: HashMap<String, Vec<String>>,
    /// Metric name → tag key → values.
    #[serde(default)]
    pub tag_values: HashMap<String, HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    /// Field name → values.
    #[serde(default)]
    pub field_values: HashMap<String, Vec<String>>,
}

/// [`CatalogClient`] over an in-memory snapshot. Serves the CLI's
/// offline mode and doubles as the reference behavior for the trait:
/// unknown scopes answer `NotFound`, never an empty success.
pub struct StaticCatalog {
    snapshot: CatalogSnapshot,
}

impl StaticCatalog {
    #[must_use]
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot from a JSON file.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot = serde_json::from_slice(&bytes)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl CatalogClient for StaticCatalog {
    async fn metrics(&self) -> Result<Vec<String>> {
        Ok(self.snapshot.metrics.clone())
    }

    async fn tags(&self, metric: &str) -> Result<Vec<String>> {
        self.snapshot
            .tags
            .get(metric)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("tags for metric `{metric}`")))
    }

    async fn tag_values(&self, metric: &str, tag_key: &str) -> Result<Vec<String>> {
        self.snapshot
            .tag_values
            .get(metric)
            .and_then(|keys| keys.get(tag_key))
            .cloned()
            .ok_or_else(|| {
                CatalogError::NotFound(format!("values for `{tag_key}` on `{metric}`"))
            })
    }

    async fn logs_services(&self) -> Result<Vec<String>> {
        Ok(self.snapshot.services.clone())
    }

    async fn logs_sources(&self) -> Result<Vec<String>> {
        Ok(self.snapshot.sources.clone())
    }

    async fn logs_levels(&self) -> Result<Vec<String>> {
        Ok(self.snapshot.levels.clone())
    }

    async fn logs_fields(&self) -> Result<Vec<String>> {
        Ok(self.snapshot.fields.clone())
    }

    async fn logs_field_values(&self, field: &str) -> Result<Vec<String>> {
        self.snapshot
            .field_values
            .get(field)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("values for field `{field}`")))
    }
}
