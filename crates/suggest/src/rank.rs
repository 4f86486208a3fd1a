//! Match filtering, ranking, and bucketing shared by every generator
//! branch.

use crate::MAX_SUGGESTIONS;
use assist_protocol::{CompletionItem, GroupCategory, SuggestionGroup};
use std::collections::HashSet;

/// Case-insensitive substring test.
#[must_use]
pub fn matches_substring(label: &str, token: &str) -> bool {
    token.is_empty() || label.to_lowercase().contains(&token.to_lowercase())
}

/// Case-insensitive prefix test (aggregators only).
#[must_use]
pub fn matches_prefix(label: &str, token: &str) -> bool {
    label.to_lowercase().starts_with(&token.to_lowercase())
}

/// Rank of a label against the typed token: exact, then prefix, then
/// substring, then everything else. Encoded as the leading character of
/// the sort key so a plain string sort yields the final order.
fn match_rank(label: &str, token: &str) -> u8 {
    if token.is_empty() {
        return 1;
    }
    let label = label.to_lowercase();
    let token = token.to_lowercase();
    if label == token {
        0
    } else if label.starts_with(&token) {
        1
    } else if label.contains(&token) {
        2
    } else {
        3
    }
}

/// Final shaping pass: dedup by label (first wins), re-key by match rank
/// against `token`, sort, cap, and bucket by category in fixed order.
#[must_use]
pub fn finalize(items: Vec<CompletionItem>, token: &str) -> Vec<SuggestionGroup> {
    let mut seen = HashSet::new();
    let mut items: Vec<CompletionItem> = items
        .into_iter()
        .filter(|item| seen.insert(item.label.clone()))
        .map(|item| {
            let key = format!("{}{}", match_rank(&item.label, token), item.label.to_lowercase());
            item.sort_key(key)
        })
        .collect();
    items.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    items.truncate(MAX_SUGGESTIONS);

    GroupCategory::ORDERED
        .iter()
        .filter_map(|category| {
            let bucket: Vec<CompletionItem> = items
                .iter()
                .filter(|item| item.kind.category() == *category)
                .cloned()
                .collect();
            (!bucket.is_empty()).then(|| SuggestionGroup::new(*category, bucket))
        })
        .collect()
}
