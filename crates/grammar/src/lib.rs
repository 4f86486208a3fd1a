//! # Assist Grammar
//!
//! Cursor-position parsers for the two query grammars.
//!
//! Both parsers are pure functions from `(text, cursor offset)` to a
//! [`assist_protocol::QueryContext`]: same input, same output, no hidden
//! state, and no failure mode — malformed input is classified best-effort
//! rather than rejected. The metrics grammar
//! (`[agg:]metric{tag:value} by {tags}`) and the logs grammar
//! (`facet:value AND "phrase"`) live in separate modules and share only
//! the output shape.

pub mod cursor;
pub mod logs;
pub mod metrics;
pub mod template;
pub mod validate;

pub use logs::parse_logs_context;
pub use metrics::parse_metrics_context;
pub use validate::{validate_logs, validate_metrics, SyntaxWarning};

/// Which grammar a piece of text is written in. Selected by the host
/// (the metrics editor and the logs search box are different inputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Metrics,
    Logs,
}

impl Grammar {
    /// Dispatch to the matching parser.
    #[must_use]
    pub fn parse(self, text: &str, offset: usize) -> assist_protocol::QueryContext {
        match self {
            Grammar::Metrics => parse_metrics_context(text, offset),
            Grammar::Logs => parse_logs_context(text, offset),
        }
    }

    /// Dispatch to the matching validator.
    #[must_use]
    pub fn validate(self, text: &str) -> Vec<SyntaxWarning> {
        match self {
            Grammar::Metrics => validate_metrics(text),
            Grammar::Logs => validate_logs(text),
        }
    }
}
