//! HTTP client for the ECOS open API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::sanitize;
use crate::sources::{DataSource, SeriesRequest};
use crate::stats::{ProviderFailure, SeriesData, StatisticItem};

use super::parse;

pub struct EcosSettings {
    pub base_url: String,
    pub api_key: SecretString,
    pub language: String,
    pub max_rows: u32,
    pub timeout: Duration,
}

pub struct EcosClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    language: String,
    max_rows: u32,
}

impl EcosClient {
    pub fn new(settings: EcosSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
            language: settings.language,
            max_rows: settings.max_rows,
        })
    }

    fn endpoint(&self, service: &str) -> String {
        format!(
            "{}/{}/{}/json/{}/1/{}",
            self.base_url,
            service,
            self.api_key.expose_secret(),
            self.language,
            self.max_rows
        )
    }

    pub(crate) fn item_list_url(&self, stat_code: &str) -> String {
        format!("{}/{}", self.endpoint(parse::ITEM_LIST_TABLE), stat_code)
    }

    pub(crate) fn series_url(&self, request: &SeriesRequest) -> String {
        let mut parts = vec![
            request.stat_code.as_str(),
            request.cycle.code(),
            request.start.as_str(),
            request.end.as_str(),
        ];
        if let Some(item) = request.item_code.as_deref().filter(|c| !c.is_empty()) {
            parts.push(item);
        }
        format!("{}/{}", self.endpoint(parse::SERIES_TABLE), parts.join("/"))
    }

    async fn get_json(&self, url: &str) -> Result<Value, ProviderFailure> {
        let redacted = sanitize::redact_secret_in_url(url, self.api_key.expose_secret());
        debug!(url = %redacted, "ECOS request");

        let response = self.client.get(url).send().await.map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %redacted, "ECOS returned HTTP error");
            return Err(ProviderFailure::new(
                ProviderFailure::TRANSPORT,
                format!("HTTP {}", status),
            ));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                transport_failure(e)
            } else {
                ProviderFailure::new(
                    ProviderFailure::MALFORMED,
                    format!("Response is not JSON: {}", e.without_url()),
                )
            }
        })
    }
}

/// Maps a reqwest error, dropping its URL so the key cannot leak.
fn transport_failure(error: reqwest::Error) -> ProviderFailure {
    let code = if error.is_timeout() {
        ProviderFailure::TIMEOUT
    } else {
        ProviderFailure::TRANSPORT
    };
    ProviderFailure::new(code, error.without_url().to_string())
}

#[async_trait]
impl DataSource for EcosClient {
    async fn list_items(&self, stat_code: &str) -> Result<Vec<StatisticItem>, ProviderFailure> {
        info!(stat_code, "Fetching statistic item list");
        let body = self.get_json(&self.item_list_url(stat_code)).await?;
        parse::parse_item_list(&body).inspect_err(|failure| {
            warn!(stat_code, code = %failure.code, message = %failure.message, "ECOS item list failed");
        })
    }

    async fn fetch_series(&self, request: &SeriesRequest) -> Result<SeriesData, ProviderFailure> {
        info!(
            stat_code = %request.stat_code,
            cycle = %request.cycle,
            start = %request.start,
            end = %request.end,
            item_code = request.item_code.as_deref().unwrap_or(""),
            "Fetching statistic series"
        );
        let body = self.get_json(&self.series_url(request)).await?;
        parse::parse_series(&body).inspect_err(|failure| {
            warn!(stat_code = %request.stat_code, code = %failure.code, message = %failure.message, "ECOS series search failed");
        })
    }
}
