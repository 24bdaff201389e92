//! Query classification.
//!
//! Decides whether a query reads like a sentence (and goes to the model) or
//! is already a pattern the user wants searched verbatim.

use regex::Regex;
use std::sync::OnceLock;

/// How a query will be turned into a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Send to the language model.
    NaturalLanguage,
    /// Use as the pattern unchanged.
    Literal,
}

fn keyword_groups() -> &'static [Regex; 3] {
    static GROUPS: OnceLock<[Regex; 3]> = OnceLock::new();
    #[allow(clippy::expect_used)]
    GROUPS.get_or_init(|| {
        [
            r"(?i-u)\b(find|search|show|get|list|display)\b",
            r"(?i-u)\b(files?|lines?|containing|with|in|that|have)\b",
            r"(?i-u)\b(emails?|urls?|ips?|dates?|numbers?|phone)\b",
        ]
        .map(|source| Regex::new(source).expect("keyword regex is valid"))
    })
}

/// Whether the query contains any action, structure or domain keyword.
#[must_use]
pub fn is_probably_natural_language(query: &str) -> bool {
    keyword_groups().iter().any(|re| re.is_match(query))
}

/// Classify a query. `force_literal` bypasses the heuristic.
#[must_use]
pub fn classify_query(query: &str, force_literal: bool) -> QueryKind {
    if !force_literal && is_probably_natural_language(query) {
        QueryKind::NaturalLanguage
    } else {
        QueryKind::Literal
    }
}
