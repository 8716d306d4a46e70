//! Per-run pipeline state and the patches stages return.

use serde::Serialize;

use crate::stats::{FetchedItem, QueryParameters, Statistic, StatisticItem};

use super::error::StageError;

/// The single record threaded through all stages of one run.
///
/// Optional fields start empty; `None` means "not yet run or no result".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    query: String,
    pub candidate_statistics: Option<Vec<Statistic>>,
    pub selected_statistic: Option<Statistic>,
    pub available_items: Option<Vec<StatisticItem>>,
    pub selected_parameters: Option<Vec<QueryParameters>>,
    pub fetched_results: Option<Vec<FetchedItem>>,
    pub retry_budget_remaining: u32,
    pub last_error: Option<StageError>,
    pub answer: Option<String>,
}

impl PipelineState {
    pub fn new(query: &str, retry_budget: u32) -> Self {
        Self {
            query: query.to_string(),
            candidate_statistics: None,
            selected_statistic: None,
            available_items: None,
            selected_parameters: None,
            fetched_results: None,
            retry_budget_remaining: retry_budget,
            last_error: None,
            answer: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Previous failure rendered for the oracle, if any.
    pub fn last_error_text(&self) -> Option<String> {
        self.last_error.as_ref().map(ToString::to_string)
    }

    pub fn apply(&mut self, update: StateUpdate) {
        update.candidate_statistics.apply(&mut self.candidate_statistics);
        update.selected_statistic.apply(&mut self.selected_statistic);
        update.available_items.apply(&mut self.available_items);
        update.selected_parameters.apply(&mut self.selected_parameters);
        update.fetched_results.apply(&mut self.fetched_results);
        update.last_error.apply(&mut self.last_error);
        update.answer.apply(&mut self.answer);
    }
}

/// Replacement instruction for one optional state field.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Update<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Update<T> {
    pub fn apply(self, field: &mut Option<T>) {
        match self {
            Update::Keep => {}
            Update::Set(value) => *field = Some(value),
            Update::Clear => *field = None,
        }
    }
}

/// Fields a stage returns. Set fields replace the state's fields wholesale.
///
/// The query and the retry budget are not patchable: the query is fixed at
/// creation and only the orchestrator moves the budget.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub candidate_statistics: Update<Vec<Statistic>>,
    pub selected_statistic: Update<Statistic>,
    pub available_items: Update<Vec<StatisticItem>>,
    pub selected_parameters: Update<Vec<QueryParameters>>,
    pub fetched_results: Update<Vec<FetchedItem>>,
    pub last_error: Update<StageError>,
    pub answer: Update<String>,
}

impl StateUpdate {
    /// An update that only records `error`.
    pub fn failed(error: StageError) -> Self {
        Self {
            last_error: Update::Set(error),
            ..Self::default()
        }
    }
}
