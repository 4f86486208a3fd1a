//! Template-placeholder scrubbing.
//!
//! Dashboard hosts interpolate variables (`$node`, `${node:csv}`) into
//! queries before execution. The parser never resolves them, but their
//! raw syntax would corrupt brace and colon counting, so each placeholder
//! is replaced by a same-length run of a harmless alphanumeric character
//! before classification. Lengths are preserved exactly — placeholders
//! are ASCII — so every cursor offset stays valid.

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    // `${name}` / `${name:fmt}` first so the braced form never half-matches
    // as a bare `$name`.
    Regex::new(r"\$\{[^}\n]*\}|\$[A-Za-z_][A-Za-z0-9_]*").expect("placeholder regex")
});

/// Replace every template placeholder with `v` repeated to the same byte
/// length. Returns the input unchanged (no allocation) when no
/// placeholder is present.
#[must_use]
pub fn scrub_placeholders(line: &str) -> std::borrow::Cow<'_, str> {
    PLACEHOLDER.replace_all(line, |caps: &regex::Captures<'_>| {
        "v".repeat(caps[0].len())
    })
}
