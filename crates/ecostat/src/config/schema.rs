use serde::{Deserialize, Serialize};

use crate::secrets::KeySource;

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub ecos: EcosConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            pipeline: PipelineSettings::default(),
            ecos: EcosConfig::default(),
            llm: LlmConfig::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Failure-triggered re-entries allowed per run, shared by all stages.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
    /// Timeout applied to every external call.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    #[serde(default)]
    pub parallel_fetch: bool,
    #[serde(default = "default_recent_years")]
    pub recent_years: u32,
}

fn default_retry_budget() -> u32 {
    3
}

fn default_candidate_limit() -> usize {
    10
}

fn default_call_timeout() -> u64 {
    30
}

fn default_recent_years() -> u32 {
    2
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
            candidate_limit: default_candidate_limit(),
            call_timeout_secs: default_call_timeout(),
            parallel_fetch: false,
            recent_years: default_recent_years(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcosConfig {
    #[serde(default = "default_ecos_url")]
    pub base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_max_rows")]
    pub max_rows: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    #[serde(default = "default_ecos_key_env")]
    pub api_key_env_var: Option<String>,
}

impl EcosConfig {
    pub fn key_source(&self) -> KeySource {
        KeySource {
            api_key: self.api_key.clone(),
            api_key_file: self.api_key_file.clone(),
            api_key_env_var: self.api_key_env_var.clone(),
        }
    }
}

fn default_ecos_url() -> String {
    "http://ecos.bok.or.kr/api".to_string()
}

fn default_language() -> String {
    "kr".to_string()
}

fn default_max_rows() -> u32 {
    1000
}

fn default_ecos_key_env() -> Option<String> {
    Some("ECOS_API_KEY".to_string())
}

impl Default for EcosConfig {
    fn default() -> Self {
        Self {
            base_url: default_ecos_url(),
            language: default_language(),
            max_rows: default_max_rows(),
            api_key: None,
            api_key_file: None,
            api_key_env_var: default_ecos_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    #[serde(default = "default_llm_key_env")]
    pub api_key_env_var: Option<String>,
}

impl LlmConfig {
    pub fn key_source(&self) -> KeySource {
        KeySource {
            api_key: self.api_key.clone(),
            api_key_file: self.api_key_file.clone(),
            api_key_env_var: self.api_key_env_var.clone(),
        }
    }
}

fn default_llm_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_llm_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            model: default_model(),
            temperature: None,
            api_key: None,
            api_key_file: None,
            api_key_env_var: default_llm_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

fn default_catalog_path() -> String {
    "data/ecos_statistics.json".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}
