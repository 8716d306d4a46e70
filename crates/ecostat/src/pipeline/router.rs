//! Routing policy applied after every non-terminal stage.
//!
//! `route` is pure: it reads the post-stage state and returns a decision
//! carrying the new budget. The runner applies the decision.

use super::stage::StageId;
use super::state::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Stage(StageId),
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub next: Next,
    pub retry_budget: u32,
    /// True when this decision re-enters a stage after a failure.
    pub is_retry: bool,
}

impl RouteDecision {
    fn advance(to: Next, budget: u32) -> Self {
        Self {
            next: to,
            retry_budget: budget,
            is_retry: false,
        }
    }

    fn retry(stage: StageId, budget: u32) -> Self {
        Self {
            next: Next::Stage(stage),
            retry_budget: budget - 1,
            is_retry: true,
        }
    }
}

fn is_missing<T>(value: &Option<Vec<T>>) -> bool {
    value.as_ref().map_or(true, |v| v.is_empty())
}

/// Whether `stage` left the state in a failed condition.
pub fn stage_failed(stage: StageId, state: &PipelineState) -> bool {
    if state.last_error.is_some() {
        return true;
    }
    match stage {
        StageId::CandidateLookup => is_missing(&state.candidate_statistics),
        StageId::StatisticSelection => state.selected_statistic.is_none(),
        StageId::ItemListLookup => is_missing(&state.available_items),
        StageId::ParameterSelection => is_missing(&state.selected_parameters),
        StageId::DataFetch => is_missing(&state.fetched_results),
        StageId::AnswerSynthesis => false,
    }
}

/// Decides what runs after `stage`.
///
/// Failures spend one unit of the shared budget and re-run the same stage,
/// except Data Fetch which re-runs Parameter Selection. With no budget left
/// the run terminates, except after Data Fetch where it degrades into
/// Answer Synthesis.
pub fn route(stage: StageId, state: &PipelineState) -> RouteDecision {
    let budget = state.retry_budget_remaining;

    if stage.is_terminal() {
        return RouteDecision::advance(Next::Terminate, budget);
    }

    if !stage_failed(stage, state) {
        let next = stage.next().map_or(Next::Terminate, Next::Stage);
        return RouteDecision::advance(next, budget);
    }

    match (stage, budget) {
        (StageId::DataFetch, 0) => {
            RouteDecision::advance(Next::Stage(StageId::AnswerSynthesis), 0)
        }
        (StageId::DataFetch, _) => RouteDecision::retry(StageId::ParameterSelection, budget),
        (_, 0) => RouteDecision::advance(Next::Terminate, 0),
        (_, _) => RouteDecision::retry(stage, budget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::StageError;
    use crate::stats::{Cycle, Statistic};

    fn state_with_budget(budget: u32) -> PipelineState {
        PipelineState::new("GDP", budget)
    }

    #[test]
    fn test_success_advances_in_fixed_order() {
        let mut state = state_with_budget(3);
        state.candidate_statistics = Some(vec![Statistic::new("A", "a", Cycle::Annual, "")]);
        let decision = route(StageId::CandidateLookup, &state);
        assert_eq!(decision.next, Next::Stage(StageId::StatisticSelection));
        assert_eq!(decision.retry_budget, 3);
        assert!(!decision.is_retry);
    }

    #[test]
    fn test_failure_with_budget_retries_same_stage() {
        let state = state_with_budget(2);
        let decision = route(StageId::CandidateLookup, &state);
        assert_eq!(decision.next, Next::Stage(StageId::CandidateLookup));
        assert_eq!(decision.retry_budget, 1);
        assert!(decision.is_retry);
    }

    #[test]
    fn test_failure_without_budget_terminates() {
        for stage in [
            StageId::CandidateLookup,
            StageId::StatisticSelection,
            StageId::ItemListLookup,
            StageId::ParameterSelection,
        ] {
            let decision = route(stage, &state_with_budget(0));
            assert_eq!(decision.next, Next::Terminate, "stage {}", stage);
            assert_eq!(decision.retry_budget, 0);
        }
    }

    #[test]
    fn test_fetch_failure_reenters_parameter_selection() {
        let mut state = state_with_budget(3);
        state.last_error = Some(StageError::NoParametersSelected);
        let decision = route(StageId::DataFetch, &state);
        assert_eq!(decision.next, Next::Stage(StageId::ParameterSelection));
        assert_eq!(decision.retry_budget, 2);
    }

    #[test]
    fn test_fetch_failure_without_budget_degrades_to_synthesis() {
        let decision = route(StageId::DataFetch, &state_with_budget(0));
        assert_eq!(decision.next, Next::Stage(StageId::AnswerSynthesis));
        assert_eq!(decision.retry_budget, 0);
    }

    #[test]
    fn test_error_counts_as_failure_even_with_output() {
        let mut state = state_with_budget(1);
        state.candidate_statistics = Some(vec![Statistic::new("A", "a", Cycle::Annual, "")]);
        state.last_error = Some(StageError::NoMatchFound {
            query: "GDP".to_string(),
        });
        assert!(stage_failed(StageId::CandidateLookup, &state));
    }

    #[test]
    fn test_synthesis_always_terminates() {
        let decision = route(StageId::AnswerSynthesis, &state_with_budget(3));
        assert_eq!(decision.next, Next::Terminate);
        assert_eq!(decision.retry_budget, 3);
    }
}
