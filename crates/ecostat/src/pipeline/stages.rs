//! The six stage bodies. Each reads the state and returns a [`StateUpdate`];
//! none of them touches the state or the retry budget directly.

use std::future::Future;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::oracle::{ParameterRequest, SynthesisRequest};
use crate::sources::SeriesRequest;
use crate::stats::{
    format_date, FetchedItem, Period, ProviderFailure, QueryParameters, SeriesData, Statistic,
    StatisticItem,
};

use super::error::StageError;
use super::runner::Pipeline;
use super::stage::StageId;
use super::state::{PipelineState, StateUpdate, Update};

/// Renders one fetched series as a compact item/unit/values block.
pub fn format_block(fetched: &FetchedItem) -> String {
    let values = fetched
        .data
        .series
        .iter()
        .map(|(label, points)| {
            let points = points
                .iter()
                .map(|(time, value)| format!("{}: {}", time, value))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} [{}]", label, points)
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "Item: {} Unit: {} Values: {}",
        fetched.item.name, fetched.data.unit, values
    )
}

/// Answer used when the generator fails: the raw blocks, nothing invented.
pub fn fallback_answer(query: &str, blocks: &[String]) -> String {
    if blocks.is_empty() {
        return format!(
            "No data was available to answer \"{}\". No values are reported.",
            query
        );
    }
    format!(
        "An analysis could not be generated for \"{}\". Retrieved data:\n{}",
        query,
        blocks.join("\n")
    )
}

/// Item descriptor for a parameter set; synthesized when the code is unknown.
fn resolve_item(items: &[StatisticItem], params: &QueryParameters) -> StatisticItem {
    items
        .iter()
        .find(|i| i.code == params.item_code && i.cycle == params.cycle)
        .or_else(|| items.iter().find(|i| i.code == params.item_code))
        .cloned()
        .unwrap_or_else(|| {
            StatisticItem::new(
                &params.item_code,
                params.label(),
                params.cycle,
                &params.start_time,
                &params.end_time,
            )
        })
}

/// Reason `params` reaches outside the item's published range, if it does.
/// Only checked when both sides use the same cycle.
fn range_violation(item: &StatisticItem, params: &QueryParameters) -> Option<String> {
    if item.cycle != params.cycle {
        return None;
    }
    let first = Period::parse(&item.start_time, item.cycle)?;
    let last = Period::parse(&item.end_time, item.cycle)?;
    let outside =
        |raw: &str| Period::parse(raw, item.cycle).is_some_and(|p| p < first || p > last);

    (outside(&params.start_time) || outside(&params.end_time)).then(|| {
        format!(
            "{} [{}~{}] is outside the available range {}~{}",
            params.item_code, params.start_time, params.end_time, item.start_time, item.end_time
        )
    })
}

fn series_request(statistic: &Statistic, params: &QueryParameters) -> SeriesRequest {
    SeriesRequest {
        stat_code: statistic.code.clone(),
        cycle: params.cycle,
        start: format_date(&params.start_time, params.cycle),
        end: format_date(&params.end_time, params.cycle),
        item_code: Some(params.item_code.clone()).filter(|c| !c.trim().is_empty()),
    }
}

impl Pipeline {
    /// Awaits `future` under the per-call timeout.
    async fn bounded<T>(
        &self,
        stage: StageId,
        future: impl Future<Output = T>,
    ) -> Result<T, StageError> {
        tokio::time::timeout(self.config.call_timeout, future)
            .await
            .map_err(|_| {
                warn!(%stage, "External call timed out");
                StageError::Timeout {
                    stage,
                    seconds: self.config.call_timeout.as_secs(),
                }
            })
    }

    pub(super) async fn step_candidate_lookup(&self, state: &PipelineState) -> StateUpdate {
        let stage = StageId::CandidateLookup;
        let found = self
            .bounded(
                stage,
                self.candidates
                    .search(state.query(), self.config.candidate_limit),
            )
            .await
            .and_then(|r| {
                r.map_err(|e| StageError::Collaborator {
                    stage,
                    message: e.to_string(),
                })
            });

        match found {
            Ok(candidates) if !candidates.is_empty() => {
                info!(count = candidates.len(), "Candidate statistics found");
                StateUpdate {
                    candidate_statistics: Update::Set(candidates),
                    last_error: Update::Clear,
                    ..StateUpdate::default()
                }
            }
            Ok(_) => StateUpdate {
                candidate_statistics: Update::Clear,
                last_error: Update::Set(StageError::NoMatchFound {
                    query: state.query().to_string(),
                }),
                ..StateUpdate::default()
            },
            Err(e) => StateUpdate {
                candidate_statistics: Update::Clear,
                last_error: Update::Set(e),
                ..StateUpdate::default()
            },
        }
    }

    pub(super) async fn step_select_statistic(&self, state: &PipelineState) -> StateUpdate {
        let stage = StageId::StatisticSelection;
        let candidates = state.candidate_statistics.as_deref().unwrap_or_default();
        let prior_error = state.last_error_text();

        let choice = self
            .bounded(
                stage,
                self.oracle
                    .choose_one(candidates, state.query(), prior_error.as_deref()),
            )
            .await
            .and_then(|r| {
                r.map_err(|e| StageError::Collaborator {
                    stage,
                    message: e.to_string(),
                })
            });

        let rejected = |error: StageError| StateUpdate {
            selected_statistic: Update::Clear,
            last_error: Update::Set(error),
            ..StateUpdate::default()
        };

        let choice = match choice {
            Ok(choice) => choice,
            Err(e) => return rejected(e),
        };

        let Some(code) = choice.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
            return rejected(StageError::InvalidSelection {
                reason: format!("no statistic was chosen ({})", choice.reason),
            });
        };

        match candidates.iter().find(|s| s.code == code) {
            Some(statistic) => {
                info!(stat_code = %statistic.code, reason = %choice.reason, "Statistic selected");
                StateUpdate {
                    selected_statistic: Update::Set(statistic.clone()),
                    last_error: Update::Clear,
                    ..StateUpdate::default()
                }
            }
            None => {
                warn!(stat_code = code, "Oracle chose a statistic outside the candidate set");
                rejected(StageError::InvalidSelection {
                    reason: format!("code '{}' is not one of the listed statistics", code),
                })
            }
        }
    }

    pub(super) async fn step_list_items(&self, state: &PipelineState) -> StateUpdate {
        let stage = StageId::ItemListLookup;
        let failed = |error: StageError| StateUpdate {
            available_items: Update::Clear,
            last_error: Update::Set(error),
            ..StateUpdate::default()
        };

        let Some(statistic) = state.selected_statistic.as_ref() else {
            return failed(StageError::InvalidSelection {
                reason: "no statistic has been selected".to_string(),
            });
        };

        match self
            .bounded(stage, self.data.list_items(&statistic.code))
            .await
        {
            Ok(Ok(items)) if !items.is_empty() => {
                let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
                debug!(items = %names.join(","), "Items listed");
                StateUpdate {
                    available_items: Update::Set(items),
                    last_error: Update::Clear,
                    ..StateUpdate::default()
                }
            }
            Ok(Ok(_)) => failed(StageError::NoItemsFound {
                stat_code: statistic.code.clone(),
            }),
            Ok(Err(failure)) => failed(StageError::provider(&failure)),
            Err(timeout) => failed(timeout),
        }
    }

    pub(super) async fn step_select_parameters(&self, state: &PipelineState) -> StateUpdate {
        let stage = StageId::ParameterSelection;
        let failed = |error: StageError| StateUpdate {
            selected_parameters: Update::Clear,
            last_error: Update::Set(error),
            ..StateUpdate::default()
        };

        let Some(statistic) = state.selected_statistic.as_ref() else {
            return failed(StageError::InvalidSelection {
                reason: "no statistic has been selected".to_string(),
            });
        };
        let items = state.available_items.as_deref().unwrap_or_default();
        let prior_error = state.last_error_text();

        let request = ParameterRequest {
            query: state.query(),
            statistic,
            items,
            prior_error: prior_error.as_deref(),
            today: self.today(),
        };

        let parameters = match self
            .bounded(stage, self.oracle.choose_parameters(&request))
            .await
        {
            Ok(Ok(parameters)) => parameters,
            Ok(Err(e)) => {
                return failed(StageError::Collaborator {
                    stage,
                    message: e.to_string(),
                })
            }
            Err(timeout) => return failed(timeout),
        };

        if parameters.is_empty() {
            return failed(StageError::NoParametersSelected);
        }

        // Unknown items and out-of-range windows are carried as returned; the
        // provider's failure reroutes from Data Fetch with its code as context.
        for params in &parameters {
            match items.iter().find(|i| i.code == params.item_code && i.cycle == params.cycle) {
                Some(item) => {
                    if let Some(reason) = range_violation(item, params) {
                        warn!(%reason, "Selected window is outside the item's range");
                    }
                }
                None if !items.iter().any(|i| i.code == params.item_code) => {
                    warn!(item_code = %params.item_code, "Selected item is not in the item list");
                }
                None => {}
            }
        }

        for params in &parameters {
            if params.cycle != statistic.cycle {
                warn!(
                    item_code = %params.item_code,
                    requested = %params.cycle,
                    expected = %statistic.cycle,
                    "Selected cycle differs from the statistic's cycle"
                );
            }
        }

        info!(
            count = parameters.len(),
            "Parameters selected: {}",
            parameters
                .iter()
                .map(|p| format!("{}[{}~{}]", p.item_code, p.start_time, p.end_time))
                .collect::<Vec<_>>()
                .join(", ")
        );

        StateUpdate {
            selected_parameters: Update::Set(parameters),
            last_error: Update::Clear,
            ..StateUpdate::default()
        }
    }

    /// Fetches one parameter set; an empty payload counts as a failure.
    async fn fetch_one(
        &self,
        statistic: &Statistic,
        params: &QueryParameters,
    ) -> Result<SeriesData, StageError> {
        let request = series_request(statistic, params);
        match self
            .bounded(StageId::DataFetch, self.data.fetch_series(&request))
            .await?
        {
            Ok(data) if !data.is_empty() => Ok(data),
            Ok(_) => Err(StageError::fetch(
                params.label(),
                &ProviderFailure::new(
                    ProviderFailure::NO_DATA,
                    "The provider returned no values for the requested window",
                ),
            )),
            Err(failure) => Err(StageError::fetch(params.label(), &failure)),
        }
    }

    pub(super) async fn step_fetch_data(&self, state: &PipelineState) -> StateUpdate {
        let failed = |error: StageError| {
            warn!(error = %error, "Data fetch failed; discarding results of this attempt");
            StateUpdate {
                fetched_results: Update::Clear,
                last_error: Update::Set(error),
                ..StateUpdate::default()
            }
        };

        let Some(statistic) = state.selected_statistic.as_ref() else {
            return failed(StageError::InvalidSelection {
                reason: "no statistic has been selected".to_string(),
            });
        };
        let parameters = state.selected_parameters.as_deref().unwrap_or_default();
        if parameters.is_empty() {
            return failed(StageError::NoParametersSelected);
        }
        let items = state.available_items.as_deref().unwrap_or_default();

        let mut fetched = Vec::with_capacity(parameters.len());

        if self.config.parallel_fetch {
            let outcomes =
                join_all(parameters.iter().map(|p| self.fetch_one(statistic, p))).await;
            // First failure by request order wins, as in sequential mode.
            for (params, outcome) in parameters.iter().zip(outcomes) {
                match outcome {
                    Ok(data) => fetched.push(FetchedItem {
                        item: resolve_item(items, params),
                        data,
                    }),
                    Err(e) => return failed(e),
                }
            }
        } else {
            for params in parameters {
                match self.fetch_one(statistic, params).await {
                    Ok(data) => fetched.push(FetchedItem {
                        item: resolve_item(items, params),
                        data,
                    }),
                    Err(e) => return failed(e),
                }
            }
        }

        info!(count = fetched.len(), "Series fetched");
        StateUpdate {
            fetched_results: Update::Set(fetched),
            last_error: Update::Clear,
            ..StateUpdate::default()
        }
    }

    pub(super) async fn step_synthesize(&self, state: &PipelineState) -> StateUpdate {
        let stage = StageId::AnswerSynthesis;
        let blocks: Vec<String> = state
            .fetched_results
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(format_block)
            .collect();

        if blocks.is_empty() {
            info!("Synthesizing without data");
        }

        let request = SynthesisRequest {
            query: state.query(),
            statistic: state.selected_statistic.as_ref(),
            blocks: &blocks,
            today: self.today(),
        };

        let answer = match self.bounded(stage, self.generator.synthesize(&request)).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                warn!(error = %e, "Answer generation failed; using raw data answer");
                fallback_answer(state.query(), &blocks)
            }
            Err(timeout) => {
                warn!(error = %timeout, "Answer generation timed out; using raw data answer");
                fallback_answer(state.query(), &blocks)
            }
        };

        StateUpdate {
            answer: Update::Set(answer),
            last_error: Update::Clear,
            ..StateUpdate::default()
        }
    }
}
