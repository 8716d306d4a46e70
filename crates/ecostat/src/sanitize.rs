//! Helpers for sanitizing data before it enters tracing fields.
//!
//! Logs are safe to share for debugging: these functions ensure the
//! provider API key and long user queries do not leak into spans.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Longest query prefix that may appear in a span field.
const MAX_QUERY_PREVIEW: usize = 40;

/// Replaces every occurrence of `secret` in `url` with `****`.
///
/// - `http://ecos.bok.or.kr/api/StatisticSearch/KEY/json/...` → `.../StatisticSearch/****/json/...`
/// - an empty secret leaves the URL untouched
pub fn redact_secret_in_url(url: &str, secret: &str) -> String {
    if secret.is_empty() {
        return url.to_string();
    }
    url.replace(secret, "****")
}

/// Returns at most the first few characters of a query for span fields.
pub fn preview_query(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.chars().count() <= MAX_QUERY_PREVIEW {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(MAX_QUERY_PREVIEW).collect();
    format!("{}…", head)
}

/// Short deterministic hash of a query for correlating runs without the text.
pub fn hash_query(query: &str) -> String {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
