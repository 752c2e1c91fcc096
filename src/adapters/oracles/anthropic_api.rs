//! Anthropic Messages API oracle.
//!
//! Makes direct HTTP calls to `{base_url}/v1/messages` and joins the text
//! blocks of the reply.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::ports::{
    HealthStatus, LlmOracle, OracleError, OracleRequest, OracleResponse, StopReason, TokenUsage,
};
use crate::infrastructure::logging::SecretScrubber;

/// Configuration for the Anthropic API oracle.
#[derive(Debug, Clone)]
pub struct AnthropicApiConfig {
    /// API key; read from `api_key_env` when unset
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// API base URL
    pub base_url: String,
    /// Model used when the request names none
    pub default_model: String,
    /// Value of the `anthropic-version` header
    pub api_version: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Default response token limit
    pub max_tokens: u32,
}

impl Default for AnthropicApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            default_model: "claude-sonnet-4-5-20250929".to_string(),
            api_version: "2023-06-01".to_string(),
            timeout_secs: 300,
            max_tokens: 4096,
        }
    }
}

impl AnthropicApiConfig {
    /// Explicit key, else the one from `api_key_env`
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Set an explicit API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Point at another endpoint
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

/// Oracle backed by the Anthropic Messages API.
pub struct AnthropicApiOracle {
    config: AnthropicApiConfig,
    client: Client,
}

impl AnthropicApiOracle {
    /// Build the HTTP client. The key is checked per request
    pub fn new(config: AnthropicApiConfig) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LlmOracle for AnthropicApiOracle {
    fn oracle_id(&self) -> &'static str {
        "anthropic-api"
    }

    fn oracle_name(&self) -> &'static str {
        "Anthropic Messages API"
    }

    async fn generate(&self, request: OracleRequest) -> Result<OracleResponse, OracleError> {
        let api_key = self.config.get_api_key().ok_or_else(|| {
            OracleError::NotConfigured(format!("{} not set", self.config.api_key_env))
        })?;

        let params = &request.parameters;
        let model = params.model.as_deref().unwrap_or(&self.config.default_model);
        let body = MessagesRequest {
            model,
            max_tokens: params.max_tokens.unwrap_or(self.config.max_tokens),
            system: &request.system_prompt,
            messages: vec![Message {
                role: "user",
                content: &request.user_prompt,
            }],
            temperature: params.temperature,
        };

        tracing::debug!(model, prompt_len = request.user_prompt.len(), "Calling Anthropic API");

        let mut call = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url.trim_end_matches('/')))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body);
        if let Some(secs) = params.timeout_secs {
            call = call.timeout(Duration::from_secs(secs));
        }

        let response = call.send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(params.timeout_secs.unwrap_or(self.config.timeout_secs))
            } else {
                OracleError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = SecretScrubber::scrub(&response.text().await.unwrap_or_default());
            tracing::warn!(status = status.as_u16(), "Anthropic API returned an error");
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        let text = result
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }

        Ok(OracleResponse {
            content: text,
            stop_reason: result
                .stop_reason
                .as_deref()
                .map_or(StopReason::EndTurn, StopReason::from_api),
            usage: result.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        })
    }

    async fn health_check(&self) -> Result<HealthStatus, OracleError> {
        Ok(if self.config.get_api_key().is_some() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unavailable
        })
    }
}
