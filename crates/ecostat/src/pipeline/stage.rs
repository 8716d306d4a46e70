use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stages in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    CandidateLookup,
    StatisticSelection,
    ItemListLookup,
    ParameterSelection,
    DataFetch,
    AnswerSynthesis,
}

impl StageId {
    pub const ORDER: [StageId; 6] = [
        StageId::CandidateLookup,
        StageId::StatisticSelection,
        StageId::ItemListLookup,
        StageId::ParameterSelection,
        StageId::DataFetch,
        StageId::AnswerSynthesis,
    ];

    /// The stage that follows on success; `None` after synthesis.
    pub fn next(self) -> Option<StageId> {
        match self {
            StageId::CandidateLookup => Some(StageId::StatisticSelection),
            StageId::StatisticSelection => Some(StageId::ItemListLookup),
            StageId::ItemListLookup => Some(StageId::ParameterSelection),
            StageId::ParameterSelection => Some(StageId::DataFetch),
            StageId::DataFetch => Some(StageId::AnswerSynthesis),
            StageId::AnswerSynthesis => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == StageId::AnswerSynthesis
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageId::CandidateLookup => "candidate_lookup",
            StageId::StatisticSelection => "statistic_selection",
            StageId::ItemListLookup => "item_list_lookup",
            StageId::ParameterSelection => "parameter_selection",
            StageId::DataFetch => "data_fetch",
            StageId::AnswerSynthesis => "answer_synthesis",
        }
    }

    /// Human-readable progress line for the stage.
    pub fn describe(self) -> &'static str {
        match self {
            StageId::CandidateLookup => "Searching for candidate statistics...",
            StageId::StatisticSelection => "Selecting the best matching statistic...",
            StageId::ItemListLookup => "Fetching the statistic's item list...",
            StageId::ParameterSelection => "Choosing items and date ranges...",
            StageId::DataFetch => "Fetching time series...",
            StageId::AnswerSynthesis => "Writing the answer...",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
