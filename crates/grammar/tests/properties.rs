//! Property tests: the parsers are total, pure functions. Any text and
//! any offset — including offsets past the end or inside multi-byte
//! characters — must classify without panicking, and re-parsing the same
//! input must yield the identical context.

use assist_grammar::{parse_logs_context, parse_metrics_context, validate_logs, validate_metrics};
use proptest::prelude::*;

proptest! {
    #[test]
    fn metrics_parse_never_panics_and_is_idempotent(
        text in ".{0,80}",
        offset in 0usize..120,
    ) {
        let a = parse_metrics_context(&text, offset);
        let b = parse_metrics_context(&text, offset);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn logs_parse_never_panics_and_is_idempotent(
        text in ".{0,80}",
        offset in 0usize..120,
    ) {
        let a = parse_logs_context(&text, offset);
        let b = parse_logs_context(&text, offset);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn grammar_shaped_input_classifies_without_panic(
        agg in "(avg|sum|min|max)",
        metric in "[a-z][a-z.]{0,20}",
        key in "[a-z]{1,8}",
        value in "[a-z0-9*-]{0,8}",
        offset in 0usize..60,
    ) {
        let text = format!("{agg}:{metric}{{{key}:{value}}} by {{{key}}}");
        let ctx = parse_metrics_context(&text, offset);
        prop_assert!(ctx.cursor_offset <= text.len());
    }

    #[test]
    fn validators_never_panic(text in ".{0,120}") {
        let _ = validate_logs(&text);
        let _ = validate_metrics(&text);
    }
}
