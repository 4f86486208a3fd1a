//! Non-blocking syntax checks.
//!
//! Warnings never stop a query from running; they surface inline next to
//! the input. Policy choices: a wildcard in the middle of a value is
//! tolerated (only adjacent `**` is malformed), and `NOT` directly
//! followed by a binary operator is an invalid sequence.

use serde::Serialize;
use std::fmt;

/// One validation finding, anchored at the byte offset it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxWarning {
    pub message: String,
    pub offset: usize,
}

impl SyntaxWarning {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for SyntaxWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.offset)
    }
}

/// Record a finished word; flags an operator directly following another
/// operator when the second one is binary.
fn close_word<'q>(
    query: &'q str,
    start: Option<usize>,
    end: usize,
    prev: &mut Option<&'q str>,
    warnings: &mut Vec<SyntaxWarning>,
) {
    let Some(start) = start else { return };
    let word = &query[start..end];
    if let Some(before) = *prev {
        if matches!(before, "AND" | "OR" | "NOT") && matches!(word, "AND" | "OR") {
            warnings.push(SyntaxWarning::new(
                format!("invalid operator sequence `{before} {word}`"),
                start,
            ));
        }
    }
    *prev = Some(word);
}

/// Validate a logs-search query. Returns every finding, in text order.
#[must_use]
pub fn validate_logs(query: &str) -> Vec<SyntaxWarning> {
    let mut warnings = Vec::new();
    let mut paren_depth = 0usize;
    let mut first_open_paren = 0usize;
    let mut in_quote = false;
    let mut quote_start = 0usize;
    let mut prev_char = None;
    let mut word_start = None;
    let mut prev_word: Option<&str> = None;

    for (i, c) in query.char_indices() {
        if in_quote {
            if c == '"' && prev_char != Some('\\') {
                in_quote = false;
            }
            prev_char = Some(c);
            continue;
        }
        match c {
            '"' => {
                close_word(query, word_start.take(), i, &mut prev_word, &mut warnings);
                in_quote = true;
                quote_start = i;
            }
            '(' => {
                close_word(query, word_start.take(), i, &mut prev_word, &mut warnings);
                if paren_depth == 0 {
                    first_open_paren = i;
                }
                paren_depth += 1;
            }
            ')' => {
                close_word(query, word_start.take(), i, &mut prev_word, &mut warnings);
                if paren_depth == 0 {
                    warnings.push(SyntaxWarning::new("unmatched closing parenthesis", i));
                } else {
                    paren_depth -= 1;
                }
            }
            '*' if prev_char == Some('*') => {
                warnings.push(SyntaxWarning::new("invalid wildcard `**`", i));
            }
            c if c.is_whitespace() => {
                close_word(query, word_start.take(), i, &mut prev_word, &mut warnings);
            }
            _ => {
                if word_start.is_none() {
                    word_start = Some(i);
                }
            }
        }
        prev_char = Some(c);
    }
    close_word(query, word_start.take(), query.len(), &mut prev_word, &mut warnings);

    if in_quote {
        warnings.push(SyntaxWarning::new("unterminated quoted phrase", quote_start));
    }
    if paren_depth > 0 {
        warnings.push(SyntaxWarning::new("unmatched opening parenthesis", first_open_paren));
    }
    warnings.sort_by_key(|w| w.offset);
    warnings
}

/// Validate a metrics query: balanced braces and parens, closed quotes.
#[must_use]
pub fn validate_metrics(query: &str) -> Vec<SyntaxWarning> {
    let mut warnings = Vec::new();
    let mut brace_depth = 0usize;
    let mut first_open_brace = 0usize;
    let mut paren_depth = 0usize;
    let mut first_open_paren = 0usize;

    for (i, c) in query.char_indices() {
        match c {
            '{' => {
                if brace_depth == 0 {
                    first_open_brace = i;
                }
                brace_depth += 1;
            }
            '}' => {
                if brace_depth == 0 {
                    warnings.push(SyntaxWarning::new("unmatched closing brace", i));
                } else {
                    brace_depth -= 1;
                }
            }
            '(' => {
                if paren_depth == 0 {
                    first_open_paren = i;
                }
                paren_depth += 1;
            }
            ')' => {
                if paren_depth == 0 {
                    warnings.push(SyntaxWarning::new("unmatched closing parenthesis", i));
                } else {
                    paren_depth -= 1;
                }
            }
            _ => {}
        }
    }
    if brace_depth > 0 {
        warnings.push(SyntaxWarning::new("unmatched opening brace", first_open_brace));
    }
    if paren_depth > 0 {
        warnings.push(SyntaxWarning::new("unmatched opening parenthesis", first_open_paren));
    }
    warnings.sort_by_key(|w| w.offset);
    warnings
}
