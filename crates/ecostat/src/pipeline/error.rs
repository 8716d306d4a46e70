use serde::Serialize;
use thiserror::Error;

use crate::stats::ProviderFailure;

use super::stage::StageId;

/// Stage failure. The rendered message is fed back to the oracle on retry,
/// so it names what went wrong in terms the oracle can act on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageError {
    #[error("No statistics matched the query '{query}'")]
    NoMatchFound { query: String },

    #[error("Invalid selection: {reason}")]
    InvalidSelection { reason: String },

    #[error("No items found for statistic {stat_code}")]
    NoItemsFound { stat_code: String },

    #[error("Failed to fetch items: {message} (Code: {code})")]
    ProviderError { code: String, message: String },

    #[error("No query parameters were selected")]
    NoParametersSelected,

    #[error("Failed to fetch data for {item}: {message} (Code: {code})")]
    FetchFailed {
        item: String,
        code: String,
        message: String,
    },

    #[error("Retry budget exhausted at {stage}: {last_error}")]
    BudgetExhausted { stage: StageId, last_error: String },

    #[error("{stage} failed: {message}")]
    Collaborator { stage: StageId, message: String },

    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: StageId, seconds: u64 },
}

impl StageError {
    pub fn provider(failure: &ProviderFailure) -> Self {
        StageError::ProviderError {
            code: failure.code.clone(),
            message: failure.annotated_message(),
        }
    }

    /// Fetch failure with the recovery hint for date/cycle mismatches.
    pub fn fetch(item: &str, failure: &ProviderFailure) -> Self {
        StageError::FetchFailed {
            item: item.to_string(),
            code: failure.code.clone(),
            message: failure.annotated_message(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StageError::NoMatchFound { .. } => "no_match_found",
            StageError::InvalidSelection { .. } => "invalid_selection",
            StageError::NoItemsFound { .. } => "no_items_found",
            StageError::ProviderError { .. } => "provider_error",
            StageError::NoParametersSelected => "no_parameters_selected",
            StageError::FetchFailed { .. } => "fetch_failed",
            StageError::BudgetExhausted { .. } => "budget_exhausted",
            StageError::Collaborator { .. } => "collaborator",
            StageError::Timeout { .. } => "timeout",
        }
    }
}
