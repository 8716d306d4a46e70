//! Builders and fixtures for creating test data programmatically.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ecostat::config::{Config, LogFormat};
use ecostat::stats::{Cycle, ProviderFailure, QueryParameters, SeriesData, Statistic, StatisticItem};

// ============================================================================
// Fixtures
// ============================================================================

pub fn gdp_statistic() -> Statistic {
    Statistic::new(
        "200Y105",
        "GDP by expenditure",
        Cycle::Quarterly,
        "National Accounts > GDP by expenditure",
    )
}

pub fn gdp_item() -> StatisticItem {
    StatisticItem::new("1400", "GDP", Cycle::Quarterly, "1960Q1", "2024Q2")
}

pub fn consumption_item() -> StatisticItem {
    StatisticItem::new("1010", "Private consumption", Cycle::Quarterly, "1960Q1", "2024Q2")
}

pub fn quarterly(item: &StatisticItem, start: &str, end: &str) -> QueryParameters {
    QueryParameters::new(Cycle::Quarterly, &item.code, &item.name, start, end)
}

/// A single-label series.
pub fn series(unit: &str, label: &str, points: &[(&str, &str)]) -> SeriesData {
    let mut data = SeriesData {
        unit: unit.to_string(),
        ..SeriesData::default()
    };
    for (time, value) in points {
        data.insert(label, time, value);
    }
    data
}

pub fn no_data() -> ProviderFailure {
    ProviderFailure::new(ProviderFailure::NO_DATA, "해당하는 데이터가 없습니다.")
}

// ============================================================================
// Config
// ============================================================================

/// Builder for config files on disk.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.config.version = version.to_string();
        self
    }

    pub fn retry_budget(mut self, budget: u32) -> Self {
        self.config.pipeline.retry_budget = budget;
        self
    }

    pub fn call_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pipeline.call_timeout_secs = secs;
        self
    }

    pub fn parallel_fetch(mut self, parallel: bool) -> Self {
        self.config.pipeline.parallel_fetch = parallel;
        self
    }

    pub fn ecos_key_file(mut self, path: &Path) -> Self {
        self.config.ecos.api_key = None;
        self.config.ecos.api_key_file = Some(path.to_string_lossy().to_string());
        self
    }

    pub fn ecos_key_env_var(mut self, name: &str) -> Self {
        self.config.ecos.api_key_env_var = Some(name.to_string());
        self
    }

    pub fn catalog_path(mut self, path: &Path) -> Self {
        self.config.catalog.path = path.to_string_lossy().to_string();
        self
    }

    pub fn json_logs(mut self) -> Self {
        self.config.logging.format = LogFormat::Json;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.config).unwrap()
    }

    /// Writes `config.json` into `dir` and returns its path.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, self.to_json()).unwrap();
        path
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
