//! # Assist Suggest
//!
//! The suggestion generator: a pure mapping from a classified cursor
//! context plus fetched candidate sets to ranked, deduplicated, grouped
//! completion items. No I/O, no state — the orchestrator fetches, this
//! crate shapes.

mod generate;
mod rank;

pub use generate::{flatten, suggest};

use serde::{Deserialize, Serialize};

/// Hard cap on emitted suggestions per pass.
pub const MAX_SUGGESTIONS: usize = 100;

/// The fixed aggregator vocabulary of the metrics grammar. Matched by
/// prefix, never substring.
pub const AGGREGATORS: [&str; 6] = ["avg", "sum", "min", "max", "count", "median"];

/// Candidate sets resolved for one suggestion round. The orchestrator
/// fills only the fields the context needs; everything else stays empty
/// and the matching branches fall through to no suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidates {
    /// Metric names.
    pub metrics: Vec<String>,
    /// `"key:value"` pairs scoped to the context's metric.
    pub tag_pairs: Vec<String>,
    /// Values scoped to the context's (metric, tag key).
    pub tag_values: Vec<String>,
    pub services: Vec<String>,
    pub sources: Vec<String>,
    pub levels: Vec<String>,
    pub hosts: Vec<String>,
    pub envs: Vec<String>,
    /// Backend-defined indexed fields beyond the built-in facets.
    pub fields: Vec<String>,
}
