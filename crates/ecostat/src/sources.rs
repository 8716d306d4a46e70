//! Narrow interfaces to the retrieval collaborators.
//!
//! Implementations must be safe for concurrent use: independent runs share
//! them through `Arc`.

use async_trait::async_trait;
use thiserror::Error;

use crate::stats::{Cycle, ProviderFailure, SeriesData, Statistic, StatisticItem};

#[derive(Debug, Error)]
#[error("Candidate search failed: {0}")]
pub struct SearchError(pub String);

/// Ranked statistic lookup over free text.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Returns at most `limit` candidates, best first. An empty list is a
    /// valid answer, not an error. Must be deterministic for a fixed index.
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Statistic>, SearchError>;
}

/// A single series request with cycle-canonical dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub stat_code: String,
    pub cycle: Cycle,
    pub start: String,
    pub end: String,
    pub item_code: Option<String>,
}

/// Statistics provider.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn list_items(&self, stat_code: &str) -> Result<Vec<StatisticItem>, ProviderFailure>;

    async fn fetch_series(&self, request: &SeriesRequest) -> Result<SeriesData, ProviderFailure>;
}
