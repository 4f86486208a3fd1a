//! Operator configuration: a TOML file with serde defaults, mapped onto
//! the engine's tuning knobs.

use anyhow::{Context, Result};
use assist_catalog::OrchestratorConfig;
use assist_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// Quiet window after a keystroke before a suggestion round starts.
    pub debounce_ms: u64,
    /// Freshness window for cached candidate sets.
    pub cache_ttl_secs: u64,
    /// Bound on distinct cached candidate sets.
    pub cache_capacity: usize,
    /// Per-fetch deadline.
    pub fetch_timeout_ms: u64,
    /// Ceiling on concurrently outstanding fetches.
    pub max_in_flight: usize,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            cache_ttl_secs: 30,
            cache_capacity: 256,
            fetch_timeout_ms: 2_000,
            max_in_flight: 5,
        }
    }
}

impl AssistConfig {
    /// Defaults, overlaid with the TOML file when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("cannot parse config {}", path.display()))
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            cache_capacity: self.cache_capacity,
            max_in_flight: self.max_in_flight,
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}
