//! Decision-making collaborators.
//!
//! A selection oracle is advisory: its answers are suggestions that the
//! pipeline validates against the candidate and item sets it actually holds.
//! Two implementations ship with the crate: [`ChatOracle`] talks to an
//! OpenAI-compatible chat endpoint, [`RuleOracle`] is a deterministic
//! keyword-based stand-in for offline use and tests.

pub mod chat;
pub mod error;
pub mod prompt;
pub mod rules;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::stats::{QueryParameters, Statistic, StatisticItem};

pub use chat::{ChatOracle, ChatSettings};
pub use error::OracleError;
pub use rules::RuleOracle;

/// Oracle's pick among the candidate statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticChoice {
    #[serde(default, alias = "statCode", alias = "stat_code")]
    pub code: Option<String>,
    #[serde(default, alias = "reasoning")]
    pub reason: String,
}

impl StatisticChoice {
    pub fn pick(code: &str, reason: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            reason: reason.to_string(),
        }
    }

    pub fn none(reason: &str) -> Self {
        Self {
            code: None,
            reason: reason.to_string(),
        }
    }
}

/// Context handed to [`SelectionOracle::choose_parameters`].
#[derive(Debug, Clone, Copy)]
pub struct ParameterRequest<'a> {
    pub query: &'a str,
    pub statistic: &'a Statistic,
    pub items: &'a [StatisticItem],
    pub prior_error: Option<&'a str>,
    pub today: NaiveDate,
}

/// Context handed to [`AnswerGenerator::synthesize`].
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub query: &'a str,
    pub statistic: Option<&'a Statistic>,
    /// One formatted item/unit/values block per fetched series, in request order.
    pub blocks: &'a [String],
    pub today: NaiveDate,
}

#[async_trait]
pub trait SelectionOracle: Send + Sync {
    /// Picks the single statistic matching the user's intent.
    async fn choose_one(
        &self,
        candidates: &[Statistic],
        query: &str,
        prior_error: Option<&str>,
    ) -> Result<StatisticChoice, OracleError>;

    /// Produces one or more fully specified data requests.
    async fn choose_parameters(
        &self,
        request: &ParameterRequest<'_>,
    ) -> Result<Vec<QueryParameters>, OracleError>;
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<String, OracleError>;
}
