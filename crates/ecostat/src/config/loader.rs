use std::path::Path;

use log::info;

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = load_config_from_str(&content)?;
    info!("Loaded configuration from {:?}", path);
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

const MAX_RECENT_YEARS: u32 = 100;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    let pipeline = &config.pipeline;
    if pipeline.candidate_limit == 0 {
        return Err(invalid("pipeline.candidateLimit must be at least 1"));
    }
    if pipeline.call_timeout_secs == 0 {
        return Err(invalid("pipeline.callTimeoutSecs must be at least 1"));
    }
    if !(1..=MAX_RECENT_YEARS).contains(&pipeline.recent_years) {
        return Err(invalid(format!(
            "pipeline.recentYears must be between 1 and {}",
            MAX_RECENT_YEARS
        )));
    }

    if config.ecos.base_url.trim().is_empty() {
        return Err(invalid("ecos.baseUrl must not be empty"));
    }
    if config.ecos.max_rows == 0 {
        return Err(invalid("ecos.maxRows must be at least 1"));
    }
    if !config.ecos.key_source().is_configured() {
        return Err(invalid("ecos needs one of apiKey, apiKeyFile or apiKeyEnvVar"));
    }
    if config.llm.base_url.trim().is_empty() {
        return Err(invalid("llm.baseUrl must not be empty"));
    }
    if let Some(t) = config.llm.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(invalid(format!(
                "llm.temperature must be between 0 and 2, got {}",
                t
            )));
        }
    }
    if config.catalog.path.trim().is_empty() {
        return Err(invalid("catalog.path must not be empty"));
    }

    Ok(())
}
