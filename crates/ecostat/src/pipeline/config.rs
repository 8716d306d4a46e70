use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub retry_budget: u32,
    pub candidate_limit: usize,
    pub call_timeout: Duration,
    pub parallel_fetch: bool,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let settings = &config.pipeline;
        Self {
            retry_budget: settings.retry_budget,
            candidate_limit: settings.candidate_limit,
            call_timeout: Duration::from_secs(settings.call_timeout_secs),
            parallel_fetch: settings.parallel_fetch,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
