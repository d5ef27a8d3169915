//! FTS5 match-expression construction for the `items_fts` index.
//!
//! # Invariants
//! - Caller text is never passed through as raw FTS5 syntax.
//! - Every whitespace-separated term must match (plain-query semantics).
//! - Only the empty string means "no search filter". Non-empty text with no
//!   terms matches nothing.

/// Title predicate derived from caller search text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleMatch {
    /// Empty text: every row passes.
    Any,
    /// Non-empty text without a single term: no row passes.
    Nothing,
    /// FTS5 expression requiring every term.
    Terms(String),
}

/// Classifies `text` into a title predicate.
pub fn title_match(text: &str) -> TitleMatch {
    if text.is_empty() {
        return TitleMatch::Any;
    }
    match build_match_expression(text) {
        Some(expr) => TitleMatch::Terms(expr),
        None => TitleMatch::Nothing,
    }
}

/// Builds an FTS5 expression requiring every term of `text`.
///
/// Returns `None` for empty or whitespace-only input.
pub fn build_match_expression(text: &str) -> Option<String> {
    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}
