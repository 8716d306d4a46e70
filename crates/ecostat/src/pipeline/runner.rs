use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::oracle::{AnswerGenerator, SelectionOracle};
use crate::sanitize;
use crate::sources::{CandidateSource, DataSource};

use super::config::PipelineConfig;
use super::error::StageError;
use super::progress::{ProgressEvent, ProgressReporter};
use super::router::{route, Next};
use super::stage::StageId;
use super::state::{PipelineState, StateUpdate};

/// One stage invocation, recorded in run order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInvocation {
    pub stage: StageId,
    pub attempt: u32,
    /// Budget when the stage started.
    pub retry_budget: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Termination {
    Answered,
    Terminated { stage: StageId, error: StageError },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub state: PipelineState,
    pub termination: Termination,
    pub trace: Vec<StageInvocation>,
}

impl RunReport {
    pub fn answer(&self) -> Option<&str> {
        self.state.answer.as_deref()
    }

    pub fn is_answered(&self) -> bool {
        matches!(self.termination, Termination::Answered)
    }

    /// Invocations of `stage`, in order.
    pub fn invocations_of(&self, stage: StageId) -> usize {
        self.trace.iter().filter(|i| i.stage == stage).count()
    }
}

pub struct Pipeline {
    pub(super) config: Arc<PipelineConfig>,
    pub(super) candidates: Arc<dyn CandidateSource>,
    pub(super) oracle: Arc<dyn SelectionOracle>,
    pub(super) data: Arc<dyn DataSource>,
    pub(super) generator: Arc<dyn AnswerGenerator>,
    today: Option<NaiveDate>,
}

impl Pipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        candidates: Arc<dyn CandidateSource>,
        oracle: Arc<dyn SelectionOracle>,
        data: Arc<dyn DataSource>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            config,
            candidates,
            oracle,
            data,
            generator,
            today: None,
        }
    }

    /// Pins the date used for relative-time grounding.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub(super) fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Runs a single stage against `state` and returns its patch.
    pub async fn run_stage(&self, stage: StageId, state: &PipelineState) -> StateUpdate {
        match stage {
            StageId::CandidateLookup => self.step_candidate_lookup(state).await,
            StageId::StatisticSelection => self.step_select_statistic(state).await,
            StageId::ItemListLookup => self.step_list_items(state).await,
            StageId::ParameterSelection => self.step_select_parameters(state).await,
            StageId::DataFetch => self.step_fetch_data(state).await,
            StageId::AnswerSynthesis => self.step_synthesize(state).await,
        }
    }

    /// Answers `query`, driving stages until an answer or termination.
    pub async fn run(&self, query: &str, progress: &dyn ProgressReporter) -> RunReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.run_with_id(&run_id, query, progress).await
    }

    pub async fn run_with_id(
        &self,
        run_id: &str,
        query: &str,
        progress: &dyn ProgressReporter,
    ) -> RunReport {
        let span = info_span!("pipeline",
            run_id = %run_id,
            query = %sanitize::preview_query(query),
            query_hash = %sanitize::hash_query(query),
        );
        self.drive(run_id, query, progress).instrument(span).await
    }

    async fn drive(&self, run_id: &str, query: &str, progress: &dyn ProgressReporter) -> RunReport {
        let mut state = PipelineState::new(query, self.config.retry_budget);
        let mut trace = Vec::new();
        let mut attempts: HashMap<StageId, u32> = HashMap::new();
        let mut stage = StageId::CandidateLookup;

        loop {
            let attempt = {
                let count = attempts.entry(stage).or_default();
                *count += 1;
                *count
            };
            progress.report(ProgressEvent::StageStarted { stage, attempt });

            let update = self
                .run_stage(stage, &state)
                .instrument(info_span!("stage", stage = %stage, attempt))
                .await;
            state.apply(update);

            let error = state.last_error_text();
            trace.push(StageInvocation {
                stage,
                attempt,
                retry_budget: state.retry_budget_remaining,
                error: error.clone(),
            });
            progress.report(ProgressEvent::StageFinished { stage, error });

            let decision = route(stage, &state);
            state.retry_budget_remaining = decision.retry_budget;

            let next = match decision.next {
                Next::Stage(next) => Some(next),
                Next::Terminate => None,
            };
            progress.report(ProgressEvent::Routed {
                from: stage,
                to: next,
                budget: decision.retry_budget,
                retry: decision.is_retry,
            });

            match next {
                Some(next) => {
                    if decision.is_retry {
                        warn!(
                            failed = %stage,
                            next = %next,
                            budget = decision.retry_budget,
                            "Stage failed; retrying"
                        );
                    }
                    stage = next;
                }
                None if stage.is_terminal() => {
                    let answer = state.answer.clone().unwrap_or_default();
                    info!(stages = trace.len(), "Run answered");
                    progress.report(ProgressEvent::Completed { answer });
                    return RunReport {
                        run_id: run_id.to_string(),
                        state,
                        termination: Termination::Answered,
                        trace,
                    };
                }
                None => {
                    let error = StageError::BudgetExhausted {
                        stage,
                        last_error: state
                            .last_error_text()
                            .unwrap_or_else(|| format!("{} produced no result", stage)),
                    };
                    warn!(stage = %stage, error = %error, "Run terminated without an answer");
                    progress.report(ProgressEvent::Terminated {
                        stage,
                        error: error.to_string(),
                    });
                    return RunReport {
                        run_id: run_id.to_string(),
                        state,
                        termination: Termination::Terminated { stage, error },
                        trace,
                    };
                }
            }
        }
    }
}
