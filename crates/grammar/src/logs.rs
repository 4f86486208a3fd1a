//! Cursor classifier for the logs-search grammar:
//! `facet:value (AND|OR|NOT) "phrase" *wildcard*`.
//!
//! Unlike the metrics grammar there is no positional structure to walk;
//! classification looks at the tightest pattern ending at the cursor.

use crate::cursor::{active_line, clamp_offset, token_before};
use assist_protocol::{ContextKind, LogsFacet, QueryContext};
use once_cell::sync::Lazy;
use regex::Regex;

/// An open `facet:` immediately before the cursor, its value still under
/// construction. Tolerates trailing wildcards and an unclosed
/// `(A OR B` value group.
static FACET_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(service|source|status|level|host|env):(?:\([^)]*|[^\s:()]*)$")
        .expect("facet value regex")
});

/// Classify the slot under the cursor in a logs search query.
///
/// Pure and total, like [`crate::parse_metrics_context`].
#[must_use]
pub fn parse_logs_context(text: &str, offset: usize) -> QueryContext {
    let offset = clamp_offset(text, offset);
    let (line, cur) = active_line(text, offset);
    let prefix = &line[..cur];

    if let Some(caps) = FACET_VALUE.captures(prefix) {
        if let Some(facet) = LogsFacet::from_name(&caps[1]) {
            let token = facet_value_token(prefix);
            return QueryContext::new(ContextKind::LogsFacetValue(facet), line, cur).token(token);
        }
    }

    let word = trailing_identifier(prefix);
    if !word.is_empty() && is_facet_prefix(word) {
        return QueryContext::new(ContextKind::LogsFacetName, line, cur).token(word.to_string());
    }

    let token = token_before(line, cur).to_string();
    QueryContext::new(ContextKind::LogsSearch, line, cur).token(token)
}

/// Whether the word before the cursor is a boolean operator — the
/// generator suppresses operator suggestions right after one.
#[must_use]
pub fn follows_operator(line: &str, cur: usize) -> bool {
    let cur = clamp_offset(line, cur);
    let trimmed = line[..cur].trim_end();
    let word = trimmed
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("");
    matches!(word, "AND" | "OR" | "NOT")
}

/// Whether the cursor sits inside an unclosed `(...)` value group —
/// composite level suggestions are withheld there.
#[must_use]
pub fn inside_value_group(line: &str, cur: usize) -> bool {
    let cur = clamp_offset(line, cur);
    let mut depth = 0usize;
    for c in line[..cur].chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth > 0
}

/// Value tokens run to the previous space, colon, or paren; wildcards
/// and dashes stay part of the token.
fn facet_value_token(prefix: &str) -> String {
    let start = prefix
        .char_indices()
        .rev()
        .take_while(|(_, c)| !c.is_whitespace() && !matches!(c, ':' | '(' | ')'))
        .last()
        .map_or(prefix.len(), |(i, _)| i);
    prefix[start..].to_string()
}

fn trailing_identifier(prefix: &str) -> &str {
    let start = prefix
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        .last()
        .map_or(prefix.len(), |(i, _)| i);
    &prefix[start..]
}

fn is_facet_prefix(word: &str) -> bool {
    let word = word.to_ascii_lowercase();
    ["service", "source", "status", "level", "host", "env"]
        .iter()
        .any(|name| name.starts_with(&word))
}
