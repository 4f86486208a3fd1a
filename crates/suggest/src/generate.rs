//! Per-context suggestion branches.

use crate::rank::{finalize, matches_prefix, matches_substring};
use crate::{Candidates, AGGREGATORS};
use assist_grammar::logs::{follows_operator, inside_value_group};
use assist_protocol::{
    CompletionItem, ContextKind, ItemKind, LogsFacet, QueryContext, SuggestionGroup,
};
use std::collections::BTreeSet;

/// Composite severity suggestions, offered when every member level
/// exists in the backend list and the cursor is not already inside a
/// value group.
const LEVEL_COMPOSITES: [(&str, [&str; 2]); 2] = [
    ("(ERROR OR WARN)", ["ERROR", "WARN"]),
    ("(ERROR OR CRITICAL)", ["ERROR", "CRITICAL"]),
];

/// Generate ranked, grouped suggestions for a classified cursor context.
///
/// Pure: same context and candidates, same output. Candidate fields the
/// context does not use are ignored.
#[must_use]
pub fn suggest(ctx: &QueryContext, candidates: &Candidates) -> Vec<SuggestionGroup> {
    let token = ctx.current_token.as_str();
    let items = match ctx.kind {
        ContextKind::MetricName => filtered(&candidates.metrics, token, ItemKind::Metric),
        ContextKind::AggregatorPrefix => AGGREGATORS
            .iter()
            .filter(|name| matches_prefix(name, token))
            .map(|name| CompletionItem::new(*name, ItemKind::Aggregator))
            .collect(),
        ContextKind::FilterTagKey | ContextKind::GroupingTag => {
            tag_key_items(&candidates.tag_pairs, &ctx.existing_keys, token)
        }
        ContextKind::FilterTagValue => filtered(&candidates.tag_values, token, ItemKind::TagValue),
        ContextKind::LogsFacetValue(facet) => facet_value_items(ctx, facet, candidates),
        ContextKind::LogsSearch | ContextKind::LogsFacetName => search_items(ctx, candidates),
    };
    finalize(items, token)
}

/// Keyboard-navigation order of the dropdown: groups in category order,
/// items in rank order within each.
#[must_use]
pub fn flatten(groups: &[SuggestionGroup]) -> Vec<CompletionItem> {
    groups
        .iter()
        .flat_map(|group| group.items.iter().cloned())
        .collect()
}

fn filtered(labels: &[String], token: &str, kind: ItemKind) -> Vec<CompletionItem> {
    labels
        .iter()
        .filter(|label| matches_substring(label, token))
        .map(|label| CompletionItem::new(label.clone(), kind))
        .collect()
}

/// Tag keys are the `key` halves of the fetched `"key:value"` pairs,
/// minus keys the query already uses.
fn tag_key_items(
    pairs: &[String],
    existing: &BTreeSet<String>,
    token: &str,
) -> Vec<CompletionItem> {
    let keys: BTreeSet<&str> = pairs
        .iter()
        .filter_map(|pair| pair.split_once(':').map(|(key, _)| key))
        .collect();
    keys.into_iter()
        .filter(|key| !existing.contains(*key) && matches_substring(key, token))
        .map(|key| CompletionItem::new(key, ItemKind::TagKey))
        .collect()
}

fn facet_value_items(
    ctx: &QueryContext,
    facet: LogsFacet,
    candidates: &Candidates,
) -> Vec<CompletionItem> {
    let token = ctx.current_token.as_str();
    let (values, kind) = match facet {
        LogsFacet::Service => (&candidates.services, ItemKind::Service),
        LogsFacet::Source => (&candidates.sources, ItemKind::Source),
        LogsFacet::Level => (&candidates.levels, ItemKind::Level),
        LogsFacet::Host => (&candidates.hosts, ItemKind::Host),
        LogsFacet::Env => (&candidates.envs, ItemKind::Env),
    };
    let mut items = filtered(values, token, kind);

    if facet == LogsFacet::Level && !inside_value_group(&ctx.line_text, ctx.cursor_offset) {
        let have = |level: &str| {
            candidates
                .levels
                .iter()
                .any(|l| l.eq_ignore_ascii_case(level))
        };
        for (label, members) in LEVEL_COMPOSITES {
            if members.iter().all(|m| have(m)) && matches_substring(label, token) {
                items.push(
                    CompletionItem::new(label, ItemKind::Level).detail("match either level"),
                );
            }
        }
    }
    items
}

fn search_items(ctx: &QueryContext, candidates: &Candidates) -> Vec<CompletionItem> {
    let token = ctx.current_token.as_str();
    let mut items = Vec::new();

    for facet in LogsFacet::ALL {
        if matches_substring(facet.name(), token) {
            items.push(
                CompletionItem::new(facet.name(), ItemKind::FacetName)
                    .insert_text(format!("{}:", facet.name()))
                    .detail(facet.description()),
            );
        }
    }
    for field in &candidates.fields {
        if matches_substring(field, token) {
            items.push(
                CompletionItem::new(field.clone(), ItemKind::FacetName)
                    .insert_text(format!("{field}:"))
                    .detail("Indexed field"),
            );
        }
    }

    if !follows_operator(&ctx.line_text, ctx.cursor_offset) {
        for (op, detail) in [
            ("AND", "Both terms must match"),
            ("OR", "Either term may match"),
            ("NOT", "Exclude the next term"),
        ] {
            if matches_substring(op, token) {
                items.push(CompletionItem::new(op, ItemKind::Operator).detail(detail));
            }
        }
        for (label, insert, detail) in [
            ("*", "*", "Wildcard, matches any characters"),
            ("\"phrase\"", "\"\"", "Exact phrase match"),
            ("-", "-", "Prefix to exclude a term"),
        ] {
            if matches_substring(label, token) {
                items.push(
                    CompletionItem::new(label, ItemKind::Pattern)
                        .insert_text(insert)
                        .detail(detail),
                );
            }
        }
    }
    items
}
