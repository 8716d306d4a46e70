//! Scripted collaborators and a harness that wires them into a `Pipeline`.
//!
//! Each fake answers from a queue of scripted responses and falls back to a
//! fixed response once the queue is drained. Every call is recorded so tests
//! can assert on what the pipeline asked for, and in which order.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use ecostat::oracle::{
    AnswerGenerator, OracleError, ParameterRequest, SelectionOracle, StatisticChoice,
    SynthesisRequest,
};
use ecostat::pipeline::{
    NoopProgress, Pipeline, PipelineConfig, ProgressEvent, ProgressReporter, RunReport,
};
use ecostat::sources::{CandidateSource, DataSource, SearchError, SeriesRequest};
use ecostat::stats::{ProviderFailure, QueryParameters, SeriesData, Statistic, StatisticItem};

use super::builders::{gdp_item, gdp_statistic, series};

/// Queue of responses with a fallback once drained.
pub struct Script<T: Clone> {
    queue: Mutex<VecDeque<T>>,
    fallback: T,
}

impl<T: Clone> Script<T> {
    pub fn always(value: T) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: value,
        }
    }

    /// Answers with `first` in order, then `fallback` forever.
    pub fn sequence(first: Vec<T>, fallback: T) -> Self {
        Self {
            queue: Mutex::new(first.into()),
            fallback,
        }
    }

    pub fn next(&self) -> T {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

// ============================================================================
// Candidate source
// ============================================================================

pub struct FakeCandidates {
    pub responses: Script<Result<Vec<Statistic>, String>>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl FakeCandidates {
    pub fn returning(statistics: Vec<Statistic>) -> Self {
        Self::scripted(Script::always(Ok(statistics)))
    }

    pub fn scripted(responses: Script<Result<Vec<Statistic>, String>>) -> Self {
        Self {
            responses,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CandidateSource for FakeCandidates {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Statistic>, SearchError> {
        self.calls.lock().unwrap().push((text.to_string(), limit));
        self.responses.next().map_err(SearchError)
    }
}

// ============================================================================
// Selection oracle and answer generator
// ============================================================================

/// What the oracle was shown on one parameter-selection call.
#[derive(Debug, Clone)]
pub struct ParameterCall {
    pub stat_code: String,
    pub item_codes: Vec<String>,
    pub prior_error: Option<String>,
}

pub struct FakeOracle {
    pub choices: Script<Result<StatisticChoice, String>>,
    pub parameters: Script<Result<Vec<QueryParameters>, String>>,
    pub answers: Script<Result<String, String>>,
    /// Synthesis sleeps this long before answering.
    pub synthesis_delay: Option<Duration>,
    pub choice_calls: Mutex<Vec<Option<String>>>,
    pub parameter_calls: Mutex<Vec<ParameterCall>>,
    pub synthesis_blocks: Mutex<Vec<Vec<String>>>,
}

impl FakeOracle {
    pub fn new(
        choice: StatisticChoice,
        parameters: Vec<QueryParameters>,
        answer: &str,
    ) -> Self {
        Self {
            choices: Script::always(Ok(choice)),
            parameters: Script::always(Ok(parameters)),
            answers: Script::always(Ok(answer.to_string())),
            synthesis_delay: None,
            choice_calls: Mutex::new(Vec::new()),
            parameter_calls: Mutex::new(Vec::new()),
            synthesis_blocks: Mutex::new(Vec::new()),
        }
    }

    pub fn parameter_calls(&self) -> Vec<ParameterCall> {
        self.parameter_calls.lock().unwrap().clone()
    }

    pub fn synthesis_blocks(&self) -> Vec<Vec<String>> {
        self.synthesis_blocks.lock().unwrap().clone()
    }
}

#[async_trait]
impl SelectionOracle for FakeOracle {
    async fn choose_one(
        &self,
        _candidates: &[Statistic],
        _query: &str,
        prior_error: Option<&str>,
    ) -> Result<StatisticChoice, OracleError> {
        self.choice_calls
            .lock()
            .unwrap()
            .push(prior_error.map(str::to_string));
        self.choices.next().map_err(OracleError::ResponseParse)
    }

    async fn choose_parameters(
        &self,
        request: &ParameterRequest<'_>,
    ) -> Result<Vec<QueryParameters>, OracleError> {
        self.parameter_calls.lock().unwrap().push(ParameterCall {
            stat_code: request.statistic.code.clone(),
            item_codes: request.items.iter().map(|i| i.code.clone()).collect(),
            prior_error: request.prior_error.map(str::to_string),
        });
        self.parameters.next().map_err(OracleError::ResponseParse)
    }
}

#[async_trait]
impl AnswerGenerator for FakeOracle {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<String, OracleError> {
        self.synthesis_blocks
            .lock()
            .unwrap()
            .push(request.blocks.to_vec());
        if let Some(delay) = self.synthesis_delay {
            tokio::time::sleep(delay).await;
        }
        self.answers.next().map_err(OracleError::ResponseParse)
    }
}

// ============================================================================
// Data source
// ============================================================================

pub struct FakeData {
    pub items: Script<Result<Vec<StatisticItem>, ProviderFailure>>,
    /// Per item code; codes without a script get an empty series.
    pub series: HashMap<String, Script<Result<SeriesData, ProviderFailure>>>,
    /// The first `stalled_fetches` series calls hang past any timeout.
    pub stalled_fetches: Mutex<usize>,
    pub list_calls: Mutex<Vec<String>>,
    pub fetch_calls: Mutex<Vec<SeriesRequest>>,
}

impl FakeData {
    pub fn new(items: Vec<StatisticItem>) -> Self {
        Self {
            items: Script::always(Ok(items)),
            series: HashMap::new(),
            stalled_fetches: Mutex::new(0),
            list_calls: Mutex::new(Vec::new()),
            fetch_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_series(
        mut self,
        item_code: &str,
        responses: Script<Result<SeriesData, ProviderFailure>>,
    ) -> Self {
        self.series.insert(item_code.to_string(), responses);
        self
    }

    pub fn stall_first_fetches(self, count: usize) -> Self {
        *self.stalled_fetches.lock().unwrap() = count;
        self
    }

    pub fn fetch_calls(&self) -> Vec<SeriesRequest> {
        self.fetch_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataSource for FakeData {
    async fn list_items(&self, stat_code: &str) -> Result<Vec<StatisticItem>, ProviderFailure> {
        self.list_calls.lock().unwrap().push(stat_code.to_string());
        self.items.next()
    }

    async fn fetch_series(&self, request: &SeriesRequest) -> Result<SeriesData, ProviderFailure> {
        self.fetch_calls.lock().unwrap().push(request.clone());

        let stall = {
            let mut remaining = self.stalled_fetches.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                true
            } else {
                false
            }
        };
        if stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        let code = request.item_code.clone().unwrap_or_default();
        match self.series.get(&code) {
            Some(script) => script.next(),
            None => Ok(SeriesData::default()),
        }
    }
}

// ============================================================================
// Progress
// ============================================================================

#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Remaining budget after every routing decision, in order.
    pub fn routed_budgets(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Routed { budget, .. } => Some(budget),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A pipeline over scripted collaborators. Defaults describe the GDP
/// scenario: one quarterly statistic with one item running to 2024Q2.
pub struct TestHarness {
    pub candidates: Arc<FakeCandidates>,
    pub oracle: Arc<FakeOracle>,
    pub data: Arc<FakeData>,
    pub config: PipelineConfig,
    pub today: NaiveDate,
}

impl TestHarness {
    pub fn new() -> Self {
        let statistic = gdp_statistic();
        let item = gdp_item();
        let params = QueryParameters::new(
            item.cycle,
            &item.code,
            &item.name,
            "2022Q3",
            "2024Q2",
        );

        Self {
            candidates: Arc::new(FakeCandidates::returning(vec![statistic.clone()])),
            oracle: Arc::new(FakeOracle::new(
                StatisticChoice::pick(&statistic.code, "matches GDP"),
                vec![params],
                "GDP grew steadily.",
            )),
            data: Arc::new(FakeData::new(vec![item]).with_series(
                "1400",
                Script::always(Ok(series(
                    "십억원",
                    "GDP",
                    &[("2024Q1", "610000.0"), ("2024Q2", "612345.6")],
                ))),
            )),
            config: PipelineConfig {
                retry_budget: 3,
                candidate_limit: 10,
                call_timeout: Duration::from_secs(30),
                parallel_fetch: false,
            },
            today: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
        }
    }

    pub fn with_candidates(mut self, candidates: FakeCandidates) -> Self {
        self.candidates = Arc::new(candidates);
        self
    }

    pub fn with_oracle(mut self, oracle: FakeOracle) -> Self {
        self.oracle = Arc::new(oracle);
        self
    }

    pub fn with_data(mut self, data: FakeData) -> Self {
        self.data = Arc::new(data);
        self
    }

    pub fn with_budget(mut self, budget: u32) -> Self {
        self.config.retry_budget = budget;
        self
    }

    pub fn with_parallel_fetch(mut self, parallel: bool) -> Self {
        self.config.parallel_fetch = parallel;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            Arc::new(self.config.clone()),
            self.candidates.clone(),
            self.oracle.clone(),
            self.data.clone(),
            self.oracle.clone(),
        )
        .with_today(self.today)
    }

    pub async fn run(&self, query: &str) -> RunReport {
        self.pipeline().run(query, &NoopProgress).await
    }

    pub async fn run_recorded(&self, query: &str) -> (RunReport, RecordingProgress) {
        let progress = RecordingProgress::default();
        let report = self.pipeline().run(query, &progress).await;
        (report, progress)
    }
}
