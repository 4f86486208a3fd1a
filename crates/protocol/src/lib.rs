//! # Assist Protocol
//!
//! Shared data shapes for the query completion pipeline: cursor
//! classification output, completion items and their grouping, and the
//! optional server-side replacement exchange.
//!
//! Everything here is plain data — produced fresh per keystroke, carried
//! across crate seams by value, serializable at every boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Indexed fields of the logs grammar usable as `name:value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogsFacet {
    Service,
    Source,
    Level,
    Host,
    Env,
}

impl LogsFacet {
    pub const ALL: [LogsFacet; 5] = [
        LogsFacet::Service,
        LogsFacet::Source,
        LogsFacet::Level,
        LogsFacet::Host,
        LogsFacet::Env,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            LogsFacet::Service => "service",
            LogsFacet::Source => "source",
            LogsFacet::Level => "status",
            LogsFacet::Host => "host",
            LogsFacet::Env => "env",
        }
    }

    /// Resolve a facet from its query-text name. `status` and `level` are
    /// interchangeable spellings of the severity facet.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "service" => Some(LogsFacet::Service),
            "source" => Some(LogsFacet::Source),
            "status" | "level" => Some(LogsFacet::Level),
            "host" => Some(LogsFacet::Host),
            "env" => Some(LogsFacet::Env),
            _ => None,
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            LogsFacet::Service => "Filter by emitting service",
            LogsFacet::Source => "Filter by log source/integration",
            LogsFacet::Level => "Filter by severity level",
            LogsFacet::Host => "Filter by originating host",
            LogsFacet::Env => "Filter by deployment environment",
        }
    }
}

/// The grammatical slot the cursor sits in. Closed set; one parse call
/// yields exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    MetricName,
    AggregatorPrefix,
    FilterTagKey,
    FilterTagValue,
    GroupingTag,
    LogsSearch,
    LogsFacetName,
    LogsFacetValue(LogsFacet),
}

/// Output of a cursor-position parse. Immutable snapshot — no identity
/// beyond its field values, regenerated on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    pub kind: ContextKind,
    /// The partial token under construction at the cursor; empty when the
    /// cursor sits on a slot boundary.
    pub current_token: String,
    /// Byte offset of the cursor within `line_text`, clamped to a char
    /// boundary.
    pub cursor_offset: usize,
    /// The line the cursor is on, after template-placeholder scrubbing.
    pub line_text: String,
    /// Scoping metric for tag/tag-value lookups, when recoverable.
    pub metric_name: Option<String>,
    /// Tag key the cursor's value belongs to (`FilterTagValue` only).
    pub tag_key: Option<String>,
    /// Keys already used in the filter braces or `by {}` list, for
    /// suppressing duplicate suggestions.
    pub existing_keys: BTreeSet<String>,
}

impl QueryContext {
    #[must_use]
    pub fn new(kind: ContextKind, line_text: impl Into<String>, cursor_offset: usize) -> Self {
        Self {
            kind,
            current_token: String::new(),
            cursor_offset,
            line_text: line_text.into(),
            metric_name: None,
            tag_key: None,
            existing_keys: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.current_token = token.into();
        self
    }

    #[must_use]
    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metric_name = Some(metric.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>) -> Self {
        self.tag_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn keys(mut self, keys: BTreeSet<String>) -> Self {
        self.existing_keys = keys;
        self
    }
}

/// What a completion item *is*. Maps 1:1 onto a [`GroupCategory`]; the
/// replacement rules also branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Aggregator,
    Metric,
    TagKey,
    TagValue,
    Service,
    Source,
    Level,
    Host,
    Env,
    FacetName,
    Operator,
    Pattern,
}

impl ItemKind {
    #[must_use]
    pub fn category(self) -> GroupCategory {
        match self {
            ItemKind::Aggregator => GroupCategory::Aggregators,
            ItemKind::Metric => GroupCategory::Metrics,
            ItemKind::Service => GroupCategory::Services,
            ItemKind::Source => GroupCategory::Sources,
            ItemKind::Level => GroupCategory::Levels,
            ItemKind::TagKey => GroupCategory::Tags,
            ItemKind::FacetName => GroupCategory::Facets,
            ItemKind::TagValue => GroupCategory::TagValues,
            ItemKind::Host | ItemKind::Env => GroupCategory::FacetValues,
            ItemKind::Operator => GroupCategory::Operators,
            ItemKind::Pattern => GroupCategory::Patterns,
        }
    }
}

/// Display buckets for the dropdown, in fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupCategory {
    Aggregators,
    Metrics,
    Services,
    Sources,
    Levels,
    Tags,
    Facets,
    TagValues,
    FacetValues,
    Operators,
    Patterns,
}

impl GroupCategory {
    /// All categories in display order. Grouping walks this array so the
    /// priority is fixed in one place.
    pub const ORDERED: [GroupCategory; 11] = [
        GroupCategory::Aggregators,
        GroupCategory::Metrics,
        GroupCategory::Services,
        GroupCategory::Sources,
        GroupCategory::Levels,
        GroupCategory::Tags,
        GroupCategory::Facets,
        GroupCategory::TagValues,
        GroupCategory::FacetValues,
        GroupCategory::Operators,
        GroupCategory::Patterns,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GroupCategory::Aggregators => "Aggregators",
            GroupCategory::Metrics => "Metrics",
            GroupCategory::Services => "Services",
            GroupCategory::Sources => "Sources",
            GroupCategory::Levels => "Levels",
            GroupCategory::Tags => "Tags",
            GroupCategory::Facets => "Facets",
            GroupCategory::TagValues => "Tag values",
            GroupCategory::FacetValues => "Facet values",
            GroupCategory::Operators => "Operators",
            GroupCategory::Patterns => "Patterns",
        }
    }
}

/// One entry of the dropdown. Regenerated per suggestion pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: ItemKind,
    /// Text committed into the query on selection. Usually the label;
    /// differs where punctuation is synthesized (e.g. `avg:`).
    pub insert_text: String,
    /// Ordering key within a group; lower sorts first.
    pub sort_key: String,
    pub detail: Option<String>,
}

impl CompletionItem {
    #[must_use]
    pub fn new(label: impl Into<String>, kind: ItemKind) -> Self {
        let label = label.into();
        Self {
            insert_text: label.clone(),
            sort_key: label.to_lowercase(),
            label,
            kind,
            detail: None,
        }
    }

    #[must_use]
    pub fn insert_text(mut self, text: impl Into<String>) -> Self {
        self.insert_text = text.into();
        self
    }

    #[must_use]
    pub fn sort_key(mut self, key: impl Into<String>) -> Self {
        self.sort_key = key.into();
        self
    }

    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A category bucket of the dropdown. Empty buckets are never emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionGroup {
    pub category: GroupCategory,
    pub label: String,
    pub items: Vec<CompletionItem>,
}

impl SuggestionGroup {
    #[must_use]
    pub fn new(category: GroupCategory, items: Vec<CompletionItem>) -> Self {
        Self {
            category,
            label: category.label().to_string(),
            items,
        }
    }
}

/// Request for the optional server-side replacement computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub query: String,
    pub cursor_offset: usize,
    pub insert_text: String,
    pub item_kind: ItemKind,
}

/// Server-computed replacement. Mirrors [`Replacement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub new_query: String,
    pub new_cursor_offset: usize,
}

/// Result of committing a suggestion: the rewritten text and where the
/// caret lands in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub new_text: String,
    pub new_cursor: usize,
}

impl From<CompleteResponse> for Replacement {
    fn from(resp: CompleteResponse) -> Self {
        Self {
            new_text: resp.new_query,
            new_cursor: resp.new_cursor_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn facet_round_trips_through_names() {
        for facet in LogsFacet::ALL {
            assert_eq!(LogsFacet::from_name(facet.name()), Some(facet));
        }
        // `level` is an accepted alias for the severity facet.
        assert_eq!(LogsFacet::from_name("level"), Some(LogsFacet::Level));
        assert_eq!(LogsFacet::from_name("bogus"), None);
    }

    #[test]
    fn every_kind_has_a_category_in_display_order() {
        let kinds = [
            ItemKind::Aggregator,
            ItemKind::Metric,
            ItemKind::TagKey,
            ItemKind::TagValue,
            ItemKind::Service,
            ItemKind::Source,
            ItemKind::Level,
            ItemKind::Host,
            ItemKind::Env,
            ItemKind::FacetName,
            ItemKind::Operator,
            ItemKind::Pattern,
        ];
        for kind in kinds {
            assert!(GroupCategory::ORDERED.contains(&kind.category()));
        }
    }

    #[test]
    fn item_defaults_derive_from_label() {
        let item = CompletionItem::new("ERROR", ItemKind::Level);
        assert_eq!(item.insert_text, "ERROR");
        assert_eq!(item.sort_key, "error");
        assert_eq!(item.detail, None);
    }

    #[test]
    fn context_serializes_as_snake_case_json() {
        let ctx = QueryContext::new(
            ContextKind::LogsFacetValue(LogsFacet::Service),
            "service:web",
            11,
        )
        .token("web");
        let json = serde_json::to_value(&ctx).expect("serialize");
        assert_eq!(json["kind"]["logs_facet_value"], "service");
        assert_eq!(json["current_token"], "web");
    }
}
