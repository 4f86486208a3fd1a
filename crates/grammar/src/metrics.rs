//! Cursor classifier for the metrics grammar:
//! `[aggregator:]metric{tag:value,...} by {tag1,tag2}`.
//!
//! Classification walks the active line in priority order: `by {...}`
//! span, filter braces, aggregator prefix, metric name. All scanning is
//! over explicit character positions — never a regex across the whole
//! line — so brace/paren edge cases stay provable.

use crate::cursor::{
    active_line, clamp_offset, matching_brace, open_paren_depth, token_before,
};
use crate::template::scrub_placeholders;
use assist_protocol::{ContextKind, QueryContext};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static BY_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+by\s+\{").expect("by-clause regex"));

static IN_LIST_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([A-Za-z0-9_.\-]+)\s+in\s*$").expect("IN-list key regex"));

static ENTRY_IN_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([A-Za-z0-9_.\-]+)\s+in\b").expect("IN entry regex"));

/// Classify the grammatical slot under the cursor in a metrics query.
///
/// Pure and total: malformed input is classified best-effort, never an
/// error. Offsets beyond the text are clamped.
#[must_use]
pub fn parse_metrics_context(text: &str, offset: usize) -> QueryContext {
    let offset = clamp_offset(text, offset);
    let (raw_line, cur) = active_line(text, offset);
    let line = scrub_placeholders(raw_line);
    let line = line.as_ref();

    // 1. Inside a `by {...}` span → grouping tag.
    if let Some((open, close)) = by_span(line, cur) {
        return grouping_context(line, cur, open, close);
    }

    // 2. Inside the first `{...}` span → filter key or value.
    if let Some(open) = line.find('{') {
        let close = matching_brace(line, open);
        if cur > open && cur <= close {
            return filter_context(line, cur, open, close);
        }
    }

    // 3. At or before the first scope-level `:` → aggregator prefix.
    if let Some(colon) = first_scope_colon(line) {
        if cur <= colon {
            let token = token_before(line, cur).to_string();
            return QueryContext::new(ContextKind::AggregatorPrefix, line, cur).token(token);
        }
    }

    // 4. Everything else is the metric name itself.
    let token = token_before(line, cur).to_string();
    QueryContext::new(ContextKind::MetricName, line, cur).token(token)
}

/// The `by {...}` span containing `cur`, if any: the last `\s+by\s+\{`
/// whose brace sits before the cursor, closed by its matching `}` or end
/// of line.
fn by_span(line: &str, cur: usize) -> Option<(usize, usize)> {
    let open = BY_OPEN
        .find_iter(line)
        .map(|m| m.end() - 1)
        .filter(|brace| *brace < cur)
        .last()?;
    let close = matching_brace(line, open);
    (cur > open && cur <= close).then_some((open, close))
}

fn grouping_context(line: &str, cur: usize, open: usize, close: usize) -> QueryContext {
    // Current token: the comma-delimited segment the cursor sits in.
    let seg_start = line[open + 1..cur].rfind(',').map_or(open + 1, |i| open + 2 + i);
    let seg_end = line[cur..close].find(',').map_or(close, |i| cur + i);
    let token = line[seg_start..seg_end].trim().to_string();

    let keys: BTreeSet<String> = line[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty() && *entry != token)
        .map(str::to_string)
        .collect();

    let mut ctx = QueryContext::new(ContextKind::GroupingTag, line, cur)
        .token(token)
        .keys(keys);
    if let Some(metric) = metric_name_of(line) {
        ctx = ctx.metric(metric);
    }
    ctx
}

fn filter_context(line: &str, cur: usize, open: usize, close: usize) -> QueryContext {
    let mut ctx = QueryContext::new(ContextKind::FilterTagValue, line, cur)
        .keys(filter_keys(line, open, close));
    if let Some(metric) = metric_name_of(line) {
        ctx = ctx.metric(metric);
    }

    // Inside an unclosed `IN (...)` list every slot is a value; the key
    // sits to the left of the parenthesis.
    if open_paren_depth(line, open, cur) > 0 {
        ctx = ctx.token(token_before(line, cur).to_string());
        if let Some(key) = in_list_key(line, open, cur) {
            ctx = ctx.tag(key);
        }
        return ctx;
    }

    // Walk backward to the nearest trigger; a `:` crossed on the way
    // means the cursor is in the value half of a `key:value` pair.
    let mut colon = None;
    let mut trigger = open;
    for (i, c) in line[open..cur].char_indices().rev() {
        let idx = open + i;
        if matches!(c, '{' | ' ' | '(' | ',') {
            trigger = idx;
            break;
        }
        if c == ':' && colon.is_none() {
            colon = Some(idx);
        }
    }

    match colon {
        Some(cpos) => {
            let key = line[trigger + 1..cpos].trim().to_string();
            let token = line[cpos + 1..cur].to_string();
            ctx = ctx.token(token);
            if !key.is_empty() {
                ctx = ctx.tag(key);
            }
            ctx
        }
        None => {
            let token = line[trigger + 1..cur].trim().to_string();
            ctx.kind = ContextKind::FilterTagKey;
            ctx.token(token)
        }
    }
}

/// Recover the tag key of an `IN (...)` list: the word matching
/// `key IN` immediately before the innermost unclosed parenthesis.
fn in_list_key(line: &str, open: usize, cur: usize) -> Option<String> {
    let mut stack = Vec::new();
    for (i, c) in line[open..cur].char_indices() {
        match c {
            '(' => stack.push(open + i),
            ')' => {
                stack.pop();
            }
            _ => {}
        }
    }
    let lparen = stack.pop()?;
    IN_LIST_KEY
        .captures(&line[..lparen])
        .map(|caps| caps[1].to_string())
}

/// Keys already present in the filter braces: comma-separated at paren
/// depth zero, `key:value` pairs and `key IN (...)` lists both counted.
fn filter_keys(line: &str, open: usize, close: usize) -> BTreeSet<String> {
    let span = &line[open + 1..close.min(line.len())];
    let mut keys = BTreeSet::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let push = |entry: &str, keys: &mut BTreeSet<String>| {
        let entry = entry.trim();
        if let Some(cpos) = entry.find(':') {
            let key = entry[..cpos].trim();
            if !key.is_empty() {
                keys.insert(key.to_string());
            }
        } else if let Some(caps) = ENTRY_IN_KEY.captures(entry) {
            keys.insert(caps[1].to_string());
        }
    };
    for (i, c) in span.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                push(&span[start..i], &mut keys);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&span[start..], &mut keys);
    keys
}

/// First `:` in the scope prefix (before any `{`), skipping escaped
/// colons. Colons inside the filter braces never start an aggregator.
fn first_scope_colon(line: &str) -> Option<usize> {
    let limit = line.find('{').unwrap_or(line.len());
    let mut prev = None;
    for (i, c) in line[..limit].char_indices() {
        if c == ':' && prev != Some('\\') {
            return Some(i);
        }
        prev = Some(c);
    }
    None
}

/// The metric a filter or grouping span belongs to: scope text up to the
/// first `{` or ` by `, with any `aggregator:` prefix stripped.
fn metric_name_of(line: &str) -> Option<String> {
    let mut limit = line.find('{').unwrap_or(line.len());
    if let Some(m) = BY_OPEN.find(line) {
        limit = limit.min(m.start());
    }
    let mut scope = &line[..limit];
    if let Some(colon) = first_scope_colon(scope) {
        scope = &scope[colon + 1..];
    }
    let scope = scope.trim();
    (!scope.is_empty()).then(|| scope.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assist_protocol::ContextKind;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> QueryContext {
        parse_metrics_context(text, text.len())
    }

    #[test]
    fn empty_text_is_metric_name_with_empty_token() {
        let ctx = parse("");
        assert_eq!(ctx.kind, ContextKind::MetricName);
        assert_eq!(ctx.current_token, "");
    }

    #[test]
    fn tag_value_after_colon() {
        let ctx = parse("avg:system.cpu.user{host:");
        assert_eq!(ctx.kind, ContextKind::FilterTagValue);
        assert_eq!(ctx.metric_name.as_deref(), Some("system.cpu.user"));
        assert_eq!(ctx.tag_key.as_deref(), Some("host"));
        assert_eq!(ctx.current_token, "");
    }

    #[test]
    fn tag_value_with_partial_token() {
        let ctx = parse("avg:sys.cpu{host:web-");
        assert_eq!(ctx.kind, ContextKind::FilterTagValue);
        assert_eq!(ctx.current_token, "web-");
    }

    #[test]
    fn grouping_after_comma_carries_existing_keys() {
        let ctx = parse("system.cpu{} by {host,");
        assert_eq!(ctx.kind, ContextKind::GroupingTag);
        assert_eq!(ctx.current_token, "");
        assert_eq!(
            ctx.existing_keys,
            BTreeSet::from(["host".to_string()])
        );
        assert_eq!(ctx.metric_name.as_deref(), Some("system.cpu"));
    }

    #[test]
    fn grouping_token_is_the_enclosing_segment() {
        // Cursor on the closing brace, right after "host".
        let ctx = parse_metrics_context("m{} by {host}", 12);
        assert_eq!(ctx.kind, ContextKind::GroupingTag);
        assert_eq!(ctx.current_token, "host");
    }

    #[test]
    fn filter_key_slots_directly_after_open_space_and_comma() {
        for (text, offset) in [
            ("m{", 2),
            ("m{ ", 3),
            ("m{host:a,", 9),
            ("m{host:a, ", 10),
        ] {
            let ctx = parse_metrics_context(text, offset);
            assert_eq!(ctx.kind, ContextKind::FilterTagKey, "input {text:?}");
            assert_eq!(ctx.current_token, "", "input {text:?}");
        }
    }

    #[test]
    fn filter_key_collects_used_keys() {
        let ctx = parse("m{host:web,env:prod,");
        assert_eq!(ctx.kind, ContextKind::FilterTagKey);
        assert_eq!(
            ctx.existing_keys,
            BTreeSet::from(["host".to_string(), "env".to_string()])
        );
    }

    #[test]
    fn aggregator_at_or_before_first_colon() {
        let ctx = parse_metrics_context("a:system.cpu{*}", 1);
        assert_eq!(ctx.kind, ContextKind::AggregatorPrefix);
        assert_eq!(ctx.current_token, "a");

        let ctx = parse_metrics_context("avg:system.cpu", 0);
        assert_eq!(ctx.kind, ContextKind::AggregatorPrefix);
        assert_eq!(ctx.current_token, "");
    }

    #[test]
    fn past_the_colon_is_metric_name() {
        let ctx = parse("avg:sys");
        assert_eq!(ctx.kind, ContextKind::MetricName);
        assert_eq!(ctx.current_token, "sys");
    }

    #[test]
    fn colon_inside_braces_does_not_create_an_aggregator_slot() {
        let ctx = parse_metrics_context("system.cpu{host:a}", 3);
        assert_eq!(ctx.kind, ContextKind::MetricName);
        assert_eq!(ctx.current_token, "sys");
    }

    #[test]
    fn in_list_value_after_open_paren() {
        let ctx = parse("m{env IN (");
        assert_eq!(ctx.kind, ContextKind::FilterTagValue);
        assert_eq!(ctx.tag_key.as_deref(), Some("env"));
        assert_eq!(ctx.current_token, "");
    }

    #[test]
    fn in_list_value_after_comma_and_mid_token() {
        let ctx = parse("m{env IN (prod,");
        assert_eq!(ctx.kind, ContextKind::FilterTagValue);
        assert_eq!(ctx.tag_key.as_deref(), Some("env"));
        assert_eq!(ctx.current_token, "");

        let ctx = parse("m{env IN (prod,sta");
        assert_eq!(ctx.kind, ContextKind::FilterTagValue);
        assert_eq!(ctx.tag_key.as_deref(), Some("env"));
        assert_eq!(ctx.current_token, "sta");
    }

    #[test]
    fn in_entry_counts_toward_existing_keys() {
        let ctx = parse("m{env IN (prod,stage),");
        assert_eq!(ctx.kind, ContextKind::FilterTagKey);
        assert_eq!(ctx.existing_keys, BTreeSet::from(["env".to_string()]));
    }

    #[test]
    fn unmatched_braces_extend_to_end_of_line() {
        let ctx = parse("m{host");
        assert_eq!(ctx.kind, ContextKind::FilterTagKey);
        assert_eq!(ctx.current_token, "host");
    }

    #[test]
    fn placeholder_colon_does_not_corrupt_classification() {
        // `${a:b}` would otherwise look like a key:value pair boundary.
        let ctx = parse("m{${a:b}");
        assert_eq!(ctx.kind, ContextKind::FilterTagKey);
    }

    #[test]
    fn active_line_is_resolved_in_multiline_text() {
        let text = "sum:other{x:y}\navg:m{a:";
        let ctx = parse_metrics_context(text, text.len());
        assert_eq!(ctx.kind, ContextKind::FilterTagValue);
        assert_eq!(ctx.metric_name.as_deref(), Some("m"));
        assert_eq!(ctx.tag_key.as_deref(), Some("a"));
    }

    #[test]
    fn parse_is_idempotent() {
        let text = "avg:system.cpu{host:web, env IN (prod,} by {host,";
        for offset in 0..=text.len() {
            let a = parse_metrics_context(text, offset);
            let b = parse_metrics_context(text, offset);
            assert_eq!(a, b);
        }
    }
}
