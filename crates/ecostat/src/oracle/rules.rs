//! Deterministic keyword-based oracle for offline runs and tests.

use async_trait::async_trait;

use crate::catalog::{keyword_tokens, overlap_score};
use crate::stats::{format_date, recent_window, QueryParameters, Statistic, StatisticItem};

use super::{
    AnswerGenerator, OracleError, ParameterRequest, SelectionOracle, StatisticChoice,
    SynthesisRequest,
};

#[derive(Debug, Clone)]
pub struct RuleOracle {
    recent_years: u32,
}

impl RuleOracle {
    pub fn new(recent_years: u32) -> Self {
        Self {
            recent_years: recent_years.max(1),
        }
    }

    fn pick_items<'a>(
        &self,
        query: &str,
        statistic: &Statistic,
        items: &'a [StatisticItem],
    ) -> Vec<&'a StatisticItem> {
        // Item lists may span several cycles; prefer the statistic's own.
        let same_cycle: Vec<&StatisticItem> = items
            .iter()
            .filter(|i| i.cycle == statistic.cycle)
            .collect();
        let pool = if same_cycle.is_empty() {
            items.iter().collect()
        } else {
            same_cycle
        };

        let query = query.to_lowercase();
        let named: Vec<&StatisticItem> = pool
            .iter()
            .copied()
            .filter(|i| !i.name.trim().is_empty() && query.contains(&i.name.to_lowercase()))
            .collect();

        if named.is_empty() {
            pool.into_iter().take(1).collect()
        } else {
            named
        }
    }
}

impl Default for RuleOracle {
    fn default() -> Self {
        Self::new(2)
    }
}

#[async_trait]
impl SelectionOracle for RuleOracle {
    async fn choose_one(
        &self,
        candidates: &[Statistic],
        query: &str,
        _prior_error: Option<&str>,
    ) -> Result<StatisticChoice, OracleError> {
        if candidates.is_empty() {
            return Ok(StatisticChoice::none("No candidate statistics were offered"));
        }

        let query_tokens = keyword_tokens(query);
        let mut best: Option<(&Statistic, usize)> = None;
        for candidate in candidates {
            let mut tokens = keyword_tokens(candidate.display_path());
            tokens.extend(keyword_tokens(&candidate.name));
            let score = overlap_score(&query_tokens, &tokens);
            if score > best.map(|(_, s)| s).unwrap_or(0) {
                best = Some((candidate, score));
            }
        }

        Ok(match best {
            Some((statistic, score)) => StatisticChoice::pick(
                &statistic.code,
                &format!("{} shares {} keyword(s) with the query", statistic.name, score),
            ),
            None => StatisticChoice::none("No candidate shares a keyword with the query"),
        })
    }

    async fn choose_parameters(
        &self,
        request: &ParameterRequest<'_>,
    ) -> Result<Vec<QueryParameters>, OracleError> {
        let cycle = request.statistic.cycle;
        let years = if request.prior_error.is_some() {
            1
        } else {
            self.recent_years
        };

        let parameters = self
            .pick_items(request.query, request.statistic, request.items)
            .into_iter()
            .map(|item| {
                let (start, end) = recent_window(cycle, &item.start_time, &item.end_time, years)
                    .unwrap_or_else(|| {
                        (
                            format_date(&item.start_time, cycle),
                            format_date(&item.end_time, cycle),
                        )
                    });
                QueryParameters::new(cycle, &item.code, &item.name, &start, &end)
            })
            .collect();

        Ok(parameters)
    }
}

#[async_trait]
impl AnswerGenerator for RuleOracle {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<String, OracleError> {
        let subject = request
            .statistic
            .map(|s| s.display_path().to_string())
            .unwrap_or_else(|| request.query.to_string());

        if request.blocks.is_empty() {
            return Ok(format!(
                "No data was available for {} as of {}.",
                subject,
                request.today.format("%Y-%m-%d")
            ));
        }

        Ok(format!(
            "{} (as of {}):\n{}",
            subject,
            request.today.format("%Y-%m-%d"),
            request.blocks.join("\n")
        ))
    }
}
