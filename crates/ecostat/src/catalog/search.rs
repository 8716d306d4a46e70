//! Keyword-overlap candidate lookup over the statistic catalog.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::debug;

use crate::sources::{CandidateSource, SearchError};
use crate::stats::Statistic;

/// Lowercased search tokens of `text`.
///
/// ASCII words shorter than two characters are dropped. Words containing
/// non-ASCII characters (Hangul, CJK) are kept whole and also contribute
/// their character bigrams, so compound terms match their parts.
pub fn keyword_tokens(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();

    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if word.is_ascii() {
            if word.len() >= 2 {
                tokens.insert(word.to_string());
            }
            continue;
        }

        tokens.insert(word.to_string());
        let chars: Vec<char> = word.chars().collect();
        for pair in chars.windows(2) {
            tokens.insert(pair.iter().collect());
        }
    }

    tokens
}

/// Number of query tokens present in the document tokens.
pub fn overlap_score(query: &BTreeSet<String>, document: &BTreeSet<String>) -> usize {
    query.intersection(document).count()
}

pub struct KeywordCatalog {
    statistics: Vec<Statistic>,
    index: Vec<BTreeSet<String>>,
}

impl KeywordCatalog {
    pub fn new(statistics: Vec<Statistic>) -> Self {
        let index = statistics
            .iter()
            .map(|s| {
                let mut tokens = keyword_tokens(&s.name);
                tokens.extend(keyword_tokens(&s.full_path));
                tokens.insert(s.code.to_lowercase());
                tokens
            })
            .collect();
        Self { statistics, index }
    }

    pub fn len(&self) -> usize {
        self.statistics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statistics.is_empty()
    }

    /// Ranks by overlap, best first; ties keep catalog order.
    pub fn rank(&self, text: &str, limit: usize) -> Vec<Statistic> {
        let query = keyword_tokens(text);
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize)> = self
            .index
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, overlap_score(&query, doc)))
            .filter(|(_, score)| *score > 0)
            .collect();
        scored.sort_by_key(|(i, score)| (Reverse(*score), *i));

        scored
            .into_iter()
            .take(limit)
            .map(|(i, _)| self.statistics[i].clone())
            .collect()
    }
}

#[async_trait]
impl CandidateSource for KeywordCatalog {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Statistic>, SearchError> {
        let found = self.rank(text, limit);
        debug!(matches = found.len(), "Catalog search finished");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Cycle;

    fn catalog() -> KeywordCatalog {
        KeywordCatalog::new(vec![
            Statistic::new(
                "200Y105",
                "GDP by expenditure",
                Cycle::Quarterly,
                "National Accounts > GDP > GDP by expenditure",
            ),
            Statistic::new("901Y009", "Consumer price index", Cycle::Monthly, ""),
            Statistic::new("901Y027", "실업률", Cycle::Monthly, "고용 > 경제활동인구 > 실업률"),
            Statistic::new("200Y106", "GDP growth", Cycle::Quarterly, "National Accounts > GDP"),
        ])
    }

    #[test]
    fn test_keyword_tokens_drops_single_ascii_letters() {
        let tokens = keyword_tokens("a GDP, of Korea");
        assert!(tokens.contains("gdp"));
        assert!(tokens.contains("of"));
        assert!(!tokens.contains("a"));
    }

    #[test]
    fn test_keyword_tokens_adds_hangul_bigrams() {
        let tokens = keyword_tokens("실업률 추이");
        assert!(tokens.contains("실업률"));
        assert!(tokens.contains("실업"));
        assert!(tokens.contains("업률"));
    }

    #[tokio::test]
    async fn test_search_ranks_by_overlap_then_catalog_order() {
        let found = catalog().search("GDP expenditure", 10).await.unwrap();
        let codes: Vec<&str> = found.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["200Y105", "200Y106"]);
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let found = catalog().search("GDP", 1).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "200Y105");
    }

    #[tokio::test]
    async fn test_search_matches_partial_hangul() {
        let found = catalog().search("실업 통계", 10).await.unwrap();
        assert_eq!(found[0].code, "901Y027");
    }

    #[tokio::test]
    async fn test_search_without_overlap_is_empty() {
        let found = catalog().search("weather forecast", 10).await.unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_search_is_deterministic() {
        let c = catalog();
        assert_eq!(c.rank("GDP growth", 10), c.rank("GDP growth", 10));
    }
}
