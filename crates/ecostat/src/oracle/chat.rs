//! Oracle backed by an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::stats::{QueryParameters, Statistic};

use super::prompt::{self, ChatMessage};
use super::{
    AnswerGenerator, OracleError, ParameterRequest, SelectionOracle, StatisticChoice,
    SynthesisRequest,
};

/// Maximum length for error bodies kept in errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}

pub struct ChatSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: SecretString,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ParameterList {
    #[serde(default)]
    queries: Vec<QueryParameters>,
}

pub struct ChatOracle {
    client: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
    temperature: Option<f32>,
}

impl ChatOracle {
    pub fn new(settings: ChatSettings) -> Result<Self, OracleError> {
        if settings.model.trim().is_empty() {
            return Err(OracleError::NotConfigured("model name is empty".to_string()));
        }
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            model: settings.model,
            api_key: settings.api_key,
            temperature: settings.temperature,
        })
    }

    async fn complete(&self, messages: &[ChatMessage], json: bool) -> Result<String, OracleError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            response_format: json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Chat completion rejected");
            return Err(OracleError::Api {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)?;

        debug!(chars = content.len(), "Chat completion received");
        Ok(content)
    }
}

pub(crate) fn parse_choice(content: &str) -> Result<StatisticChoice, OracleError> {
    let json = prompt::extract_json(content);
    serde_json::from_str(json).map_err(|e| {
        OracleError::ResponseParse(format!(
            "{}. Response was: {}",
            e,
            truncate_body(json)
        ))
    })
}

pub(crate) fn parse_parameters(content: &str) -> Result<Vec<QueryParameters>, OracleError> {
    let json = prompt::extract_json(content);
    let parsed: ParameterList = serde_json::from_str(json).map_err(|e| {
        OracleError::ResponseParse(format!(
            "{}. Response was: {}",
            e,
            truncate_body(json)
        ))
    })?;
    Ok(parsed.queries)
}

#[async_trait]
impl SelectionOracle for ChatOracle {
    async fn choose_one(
        &self,
        candidates: &[Statistic],
        query: &str,
        prior_error: Option<&str>,
    ) -> Result<StatisticChoice, OracleError> {
        let messages = prompt::statistic_selection_messages(candidates, query, prior_error);
        debug!(prompt = %messages[1].content, "Statistic selection prompt");
        let content = self.complete(&messages, true).await?;
        parse_choice(&content)
    }

    async fn choose_parameters(
        &self,
        request: &ParameterRequest<'_>,
    ) -> Result<Vec<QueryParameters>, OracleError> {
        let messages = prompt::parameter_selection_messages(request);
        debug!(prompt = %messages[1].content, "Parameter selection prompt");
        let content = self.complete(&messages, true).await?;
        parse_parameters(&content)
    }
}

#[async_trait]
impl AnswerGenerator for ChatOracle {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<String, OracleError> {
        let messages = prompt::synthesis_messages(request);
        self.complete(&messages, false).await
    }
}
