use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reporting granularity of a statistic. Serialized with the provider's codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cycle {
    #[serde(rename = "A")]
    Annual,
    #[serde(rename = "S")]
    SemiAnnual,
    #[serde(rename = "Q")]
    Quarterly,
    #[serde(rename = "M")]
    Monthly,
    #[serde(rename = "SM")]
    SemiMonthly,
    #[serde(rename = "D")]
    Daily,
}

impl Cycle {
    pub fn code(&self) -> &'static str {
        match self {
            Cycle::Annual => "A",
            Cycle::SemiAnnual => "S",
            Cycle::Quarterly => "Q",
            Cycle::Monthly => "M",
            Cycle::SemiMonthly => "SM",
            Cycle::Daily => "D",
        }
    }

    /// Human description used in prompts.
    pub fn describe(&self) -> &'static str {
        match self {
            Cycle::Annual => "Annual (YYYY)",
            Cycle::SemiAnnual => "Semi-annual (YYYYSn)",
            Cycle::Quarterly => "Quarterly (YYYYQn)",
            Cycle::Monthly => "Monthly (YYYYMM)",
            Cycle::SemiMonthly => "Semi-monthly (YYYYMMSn)",
            Cycle::Daily => "Daily (YYYYMMDD)",
        }
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cycle code '{0}'")]
pub struct UnknownCycle(pub String);

impl FromStr for Cycle {
    type Err = UnknownCycle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" | "Y" => Ok(Cycle::Annual),
            "S" => Ok(Cycle::SemiAnnual),
            "Q" => Ok(Cycle::Quarterly),
            "M" => Ok(Cycle::Monthly),
            "SM" => Ok(Cycle::SemiMonthly),
            "D" => Ok(Cycle::Daily),
            other => Err(UnknownCycle(other.to_string())),
        }
    }
}

/// A statistic family from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistic {
    pub code: String,
    pub name: String,
    pub cycle: Cycle,
    /// Hierarchical path, e.g. "National Accounts > GDP > Real GDP".
    #[serde(default)]
    pub full_path: String,
}

impl Statistic {
    pub fn new(code: &str, name: &str, cycle: Cycle, full_path: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            cycle,
            full_path: full_path.to_string(),
        }
    }

    /// Path for display; falls back to the name for catalog rows without one.
    pub fn display_path(&self) -> &str {
        if self.full_path.is_empty() {
            &self.name
        } else {
            &self.full_path
        }
    }
}

/// A sub-series of a statistic with its own valid time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticItem {
    pub code: String,
    pub name: String,
    pub cycle: Cycle,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl StatisticItem {
    pub fn new(code: &str, name: &str, cycle: Cycle, start_time: &str, end_time: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            cycle,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            unit: None,
        }
    }
}

impl fmt::Display for StatisticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- {}: {} (Cycle: {}, Available: {} ~ {})",
            self.code, self.name, self.cycle, self.start_time, self.end_time
        )
    }
}

/// One fully specified data request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameters {
    pub cycle: Cycle,
    #[serde(alias = "item_code")]
    pub item_code: String,
    #[serde(default, alias = "item_name")]
    pub item_name: String,
    #[serde(alias = "start_time", alias = "start")]
    pub start_time: String,
    #[serde(alias = "end_time", alias = "end")]
    pub end_time: String,
}

impl QueryParameters {
    pub fn new(cycle: Cycle, item_code: &str, item_name: &str, start: &str, end: &str) -> Self {
        Self {
            cycle,
            item_code: item_code.to_string(),
            item_name: item_name.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    /// Name for messages; the code when the oracle left the name blank.
    pub fn label(&self) -> &str {
        if self.item_name.is_empty() {
            &self.item_code
        } else {
            &self.item_name
        }
    }
}

/// Time-series payload: label -> (time -> value). Values stay provider strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesData {
    pub unit: String,
    pub series: BTreeMap<String, BTreeMap<String, String>>,
}

impl SeriesData {
    pub fn is_empty(&self) -> bool {
        self.series.values().all(|points| points.is_empty())
    }

    pub fn insert(&mut self, label: &str, time: &str, value: &str) {
        self.series
            .entry(label.to_string())
            .or_default()
            .insert(time.to_string(), value.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedItem {
    pub item: StatisticItem,
    pub data: SeriesData,
}

/// Structured failure reported by the statistics provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub code: String,
    pub message: String,
}

impl ProviderFailure {
    /// No data for the requested date window.
    pub const NO_DATA: &'static str = "INFO-200";
    /// Requested cycle does not exist for the statistic.
    pub const CYCLE_MISMATCH: &'static str = "ERROR-101";
    pub const TRANSPORT: &'static str = "TRANSPORT";
    pub const TIMEOUT: &'static str = "TIMEOUT";
    pub const MALFORMED: &'static str = "MALFORMED";

    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// True for codes meaning the date window or cycle did not fit the series.
    pub fn is_date_or_cycle_mismatch(&self) -> bool {
        self.code == Self::NO_DATA || self.code == Self::CYCLE_MISMATCH
    }

    /// Message with a recovery hint appended for the mismatch class.
    pub fn annotated_message(&self) -> String {
        match self.code.as_str() {
            Self::NO_DATA => format!(
                "{} (Hint: Check the date. DO NOT RETRY with the exact same parameters.)",
                self.message
            ),
            Self::CYCLE_MISMATCH => format!(
                "{} (Hint: Check the cycle. DO NOT RETRY with the exact same parameters.)",
                self.message
            ),
            _ => self.message.clone(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Code: {})", self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_serde_uses_provider_codes() {
        let json = serde_json::to_string(&Cycle::SemiMonthly).unwrap();
        assert_eq!(json, "\"SM\"");
        let parsed: Cycle = serde_json::from_str("\"Q\"").unwrap();
        assert_eq!(parsed, Cycle::Quarterly);
    }

    #[test]
    fn test_cycle_from_str_is_case_insensitive() {
        assert_eq!("m".parse::<Cycle>().unwrap(), Cycle::Monthly);
        assert_eq!(" D ".parse::<Cycle>().unwrap(), Cycle::Daily);
        assert!("X".parse::<Cycle>().is_err());
    }

    #[test]
    fn test_unknown_cycle_error_names_the_code() {
        let err = "x".parse::<Cycle>().unwrap_err();
        assert_eq!(err, UnknownCycle("X".to_string()));
        assert_eq!(err.to_string(), "unknown cycle code 'X'");
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_query_parameters_accept_snake_case_keys() {
        let json = r#"{"cycle":"Q","item_code":"1400","item_name":"GDP","start_time":"2022Q3","end_time":"2024Q2"}"#;
        let params: QueryParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.item_code, "1400");
        assert_eq!(params.end_time, "2024Q2");
    }

    #[test]
    fn test_statistic_display_path_falls_back_to_name() {
        let stat = Statistic::new("200Y105", "GDP", Cycle::Quarterly, "");
        assert_eq!(stat.display_path(), "GDP");
    }

    #[test]
    fn test_series_data_empty_when_labels_have_no_points() {
        let mut data = SeriesData::default();
        assert!(data.is_empty());
        data.series.insert("Total".to_string(), BTreeMap::new());
        assert!(data.is_empty());
        data.insert("Total", "2024Q1", "612.3");
        assert!(!data.is_empty());
    }

    #[test]
    fn test_provider_failure_hint_only_for_mismatch_codes() {
        let no_data = ProviderFailure::new(ProviderFailure::NO_DATA, "No data");
        assert!(no_data.is_date_or_cycle_mismatch());
        assert!(no_data.annotated_message().contains("Check the date"));

        let cycle = ProviderFailure::new(ProviderFailure::CYCLE_MISMATCH, "Bad cycle");
        assert!(cycle.annotated_message().contains("Check the cycle"));

        let other = ProviderFailure::new("ERROR-300", "Server busy");
        assert!(!other.is_date_or_cycle_mismatch());
        assert_eq!(other.annotated_message(), "Server busy");
        assert_eq!(other.to_string(), "Server busy (Code: ERROR-300)");
    }
}
