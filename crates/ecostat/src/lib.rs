pub mod catalog;
pub mod config;
pub mod ecos;
pub mod error;
pub mod logging;
pub mod oracle;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod sources;
pub mod stats;

pub use catalog::{load_catalog, KeywordCatalog};
pub use config::{load_config, Config};
pub use ecos::{EcosClient, EcosSettings};
pub use error::{CatalogError, ConfigError, EcostatError, Result};
pub use oracle::{AnswerGenerator, ChatOracle, ChatSettings, RuleOracle, SelectionOracle};
pub use pipeline::{Pipeline, PipelineConfig, PipelineState, RunReport, StageError, StageId};
pub use secrets::{resolve_secret, SecretError};
pub use sources::{CandidateSource, DataSource};
