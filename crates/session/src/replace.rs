//! Local token replacement: given a committed item and the context that
//! produced it, compute the exact span of the original text to rewrite
//! and where the caret lands afterwards.

use assist_grammar::cursor::{active_line, clamp_offset, token_span};
use assist_protocol::{CompletionItem, ContextKind, QueryContext, Replacement};

/// Default aggregator used when committing a metric re-anchors the line.
const DEFAULT_AGGREGATOR: &str = "avg";

/// Apply `item` to `text` at `offset` under the rules of the context
/// kind. Pure; the caller owns applying the result to its editor.
#[must_use]
pub fn apply_replacement(
    text: &str,
    offset: usize,
    item: &CompletionItem,
    ctx: &QueryContext,
) -> Replacement {
    let offset = clamp_offset(text, offset);
    let (line, cur) = active_line(text, offset);
    let line_start = offset - cur;

    match ctx.kind {
        // Selecting a metric re-anchors the whole expression: the line
        // becomes a default-aggregated query over that metric.
        ContextKind::MetricName => {
            let new_line = format!("{DEFAULT_AGGREGATOR}:{}{{*}}", item.insert_text);
            let new_cursor = line_start + new_line.len();
            Replacement {
                new_text: splice(text, line_start, line, &new_line),
                new_cursor,
            }
        }
        ContextKind::AggregatorPrefix => aggregator_rule(text, line_start, line, cur, item),
        ContextKind::GroupingTag | ContextKind::FilterTagKey => {
            list_rule(text, line_start, line, cur, item)
        }
        ContextKind::FilterTagValue => value_rule(text, line_start, line, cur, item),
        _ => {
            let (start, end) = token_span(line, cur);
            replace_span(text, line_start, line, start, end, &item.insert_text)
        }
    }
}

/// Replace the aggregator token; a `:` already present after it is
/// consumed rather than duplicated, and synthesized when absent.
fn aggregator_rule(
    text: &str,
    line_start: usize,
    line: &str,
    cur: usize,
    item: &CompletionItem,
) -> Replacement {
    let (start, end) = token_span(line, cur);
    let mut insert = item.insert_text.clone();
    let colon_follows = line[end..].starts_with(':');
    if colon_follows && insert.ends_with(':') {
        insert.pop();
    }
    if !colon_follows && !insert.ends_with(':') {
        insert.push(':');
    }
    replace_span(text, line_start, line, start, end, &insert)
}

/// Commit into a comma-separated list (`by {...}` or filter keys). A
/// partial token is completed in place; a cursor resting after a
/// complete neighbor entry gets the selection appended with a comma.
fn list_rule(
    text: &str,
    line_start: usize,
    line: &str,
    cur: usize,
    item: &CompletionItem,
) -> Replacement {
    let (start, end) = token_span(line, cur);
    let token = &line[start..end];
    let insert = &item.insert_text;

    if !token.is_empty() && insert.to_lowercase().contains(&token.to_lowercase()) {
        return replace_span(text, line_start, line, start, end, insert);
    }

    let prev = line[..cur].trim_end().chars().last();
    let needs_comma = !matches!(prev, None | Some('{') | Some(',') | Some('('));
    let insertion = if needs_comma {
        format!(",{insert}")
    } else {
        insert.clone()
    };
    replace_span(text, line_start, line, cur, cur, &insertion)
}

/// Replace only the value half of a `key:value` pair. Inside an `IN`
/// list there is no owning colon, so the plain token rule applies.
fn value_rule(
    text: &str,
    line_start: usize,
    line: &str,
    cur: usize,
    item: &CompletionItem,
) -> Replacement {
    let mut colon = None;
    for (i, c) in line[..cur].char_indices().rev() {
        match c {
            ':' => {
                colon = Some(i);
                break;
            }
            '{' | ',' | '(' | ' ' => break,
            _ => {}
        }
    }
    let (span_start, span_end) = token_span(line, cur);
    match colon {
        Some(cpos) => replace_span(
            text,
            line_start,
            line,
            cpos + 1,
            span_end.max(cpos + 1),
            &item.insert_text,
        ),
        None => replace_span(text, line_start, line, span_start, span_end, &item.insert_text),
    }
}

fn replace_span(
    text: &str,
    line_start: usize,
    line: &str,
    start: usize,
    end: usize,
    insert: &str,
) -> Replacement {
    let mut new_line = String::with_capacity(line.len() + insert.len());
    new_line.push_str(&line[..start]);
    new_line.push_str(insert);
    new_line.push_str(&line[end..]);
    Replacement {
        new_text: splice(text, line_start, line, &new_line),
        new_cursor: line_start + start + insert.len(),
    }
}

fn splice(text: &str, line_start: usize, line: &str, new_line: &str) -> String {
    let line_end = line_start + line.len();
    let mut out = String::with_capacity(text.len() - line.len() + new_line.len());
    out.push_str(&text[..line_start]);
    out.push_str(new_line);
    out.push_str(&text[line_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assist_grammar::{parse_logs_context, parse_metrics_context};
    use assist_protocol::ItemKind;
    use pretty_assertions::assert_eq;

    fn apply(text: &str, offset: usize, label: &str, kind: ItemKind) -> Replacement {
        let item = CompletionItem::new(label, kind);
        let ctx = parse_metrics_context(text, offset);
        apply_replacement(text, offset, &item, &ctx)
    }

    #[test]
    fn aggregator_commit_preserves_existing_colon() {
        let result = apply("a:system.cpu{*}", 1, "avg", ItemKind::Aggregator);
        assert_eq!(result.new_text, "avg:system.cpu{*}");
        assert_eq!(result.new_cursor, 3);
    }

    #[test]
    fn aggregator_commit_synthesizes_missing_colon() {
        // A bare "a" only classifies as aggregator once the colon
        // exists; the rule itself must still synthesize one.
        let ctx = QueryContext::new(ContextKind::AggregatorPrefix, "a", 1).token("a");
        let item = CompletionItem::new("avg", ItemKind::Aggregator);
        let result = apply_replacement("a", 1, &item, &ctx);
        assert_eq!(result.new_text, "avg:");
        assert_eq!(result.new_cursor, 4);
    }

    #[test]
    fn metric_commit_rewrites_the_whole_line() {
        let result = apply("sys", 3, "system.cpu.user", ItemKind::Metric);
        assert_eq!(result.new_text, "avg:system.cpu.user{*}");
        assert_eq!(result.new_cursor, result.new_text.len());
    }

    #[test]
    fn metric_commit_touches_only_the_active_line() {
        let text = "sum:other{a:b}\nsys";
        let result = apply(text, text.len(), "system.cpu", ItemKind::Metric);
        assert_eq!(result.new_text, "sum:other{a:b}\navg:system.cpu{*}");
        assert_eq!(result.new_cursor, result.new_text.len());
    }

    #[test]
    fn grouping_commit_after_complete_entry_inserts_with_comma() {
        let result = apply("m{} by {host}", 12, "env", ItemKind::TagKey);
        assert_eq!(result.new_text, "m{} by {host,env}");
        assert_eq!(result.new_cursor, 16);
    }

    #[test]
    fn grouping_commit_completes_a_partial_token_in_place() {
        let result = apply("m{} by {ho", 10, "host", ItemKind::TagKey);
        assert_eq!(result.new_text, "m{} by {host");
        assert_eq!(result.new_cursor, 12);
    }

    #[test]
    fn grouping_commit_right_after_comma_needs_no_separator() {
        let result = apply("m{} by {host,", 13, "env", ItemKind::TagKey);
        assert_eq!(result.new_text, "m{} by {host,env");
        assert_eq!(result.new_cursor, 16);
    }

    #[test]
    fn filter_key_commit_at_list_start() {
        let result = apply("m{", 2, "host", ItemKind::TagKey);
        assert_eq!(result.new_text, "m{host");
        assert_eq!(result.new_cursor, 6);
    }

    #[test]
    fn value_commit_replaces_only_after_the_colon() {
        let result = apply("avg:m{host:w", 12, "web-1", ItemKind::TagValue);
        assert_eq!(result.new_text, "avg:m{host:web-1");
        assert_eq!(result.new_cursor, 16);
    }

    #[test]
    fn value_commit_with_closing_brace_keeps_the_tail() {
        let result = apply("avg:m{host:w}", 12, "web-1", ItemKind::TagValue);
        assert_eq!(result.new_text, "avg:m{host:web-1}");
        assert_eq!(result.new_cursor, 16);
    }

    #[test]
    fn in_list_value_commit_replaces_the_token_only() {
        let result = apply("m{env IN (pro", 13, "prod", ItemKind::TagValue);
        assert_eq!(result.new_text, "m{env IN (prod");
        assert_eq!(result.new_cursor, 14);
    }

    #[test]
    fn logs_facet_name_commit_inserts_trailing_colon() {
        let text = "serv";
        let ctx = parse_logs_context(text, 4);
        let item = CompletionItem::new("service", ItemKind::FacetName).insert_text("service:");
        let result = apply_replacement(text, 4, &item, &ctx);
        assert_eq!(result.new_text, "service:");
        assert_eq!(result.new_cursor, 8);
    }

    #[test]
    fn logs_facet_value_commit_replaces_the_value_token() {
        let text = "status:ERR AND service:w";
        let ctx = parse_logs_context(text, text.len());
        let item = CompletionItem::new("web-app", ItemKind::Service);
        let result = apply_replacement(text, text.len(), &item, &ctx);
        assert_eq!(result.new_text, "status:ERR AND service:web-app");
        assert_eq!(result.new_cursor, result.new_text.len());
    }

    #[test]
    fn operator_commit_inserts_at_cursor() {
        let text = "crash ";
        let ctx = parse_logs_context(text, 6);
        let item = CompletionItem::new("AND", ItemKind::Operator);
        let result = apply_replacement(text, 6, &item, &ctx);
        assert_eq!(result.new_text, "crash AND");
        assert_eq!(result.new_cursor, 9);
    }
}
