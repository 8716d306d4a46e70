use thiserror::Error;

/// Errors raised while consulting a selection or answer oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Oracle returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse oracle response: {0}")]
    ResponseParse(String),

    #[error("Oracle returned an empty response")]
    EmptyResponse,

    #[error("Oracle is not configured: {0}")]
    NotConfigured(String),
}
