//! OpenAI-compatible chat completion oracle.
//!
//! Works against any server exposing `{base_url}/chat/completions`, which
//! covers hosted OpenAI as well as local model servers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::ports::{
    HealthStatus, LlmOracle, OracleError, OracleRequest, OracleResponse, StopReason, TokenUsage,
};
use crate::infrastructure::logging::SecretScrubber;

/// Settings for an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Explicit API key
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Base URL including the version segment, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Model used when the request names none
    pub default_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Default response token limit
    pub max_tokens: u32,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: "gpt-4o".to_string(),
            timeout_secs: 300,
            max_tokens: 4096,
        }
    }
}

impl OpenAiCompatibleConfig {
    /// Local servers often need no key at all.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Oracle backed by an OpenAI-compatible chat completions API.
pub struct OpenAiCompatibleOracle {
    config: OpenAiCompatibleConfig,
    client: Client,
}

impl OpenAiCompatibleOracle {
    /// Build the HTTP client
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LlmOracle for OpenAiCompatibleOracle {
    fn oracle_id(&self) -> &'static str {
        "openai-compatible"
    }

    fn oracle_name(&self) -> &'static str {
        "OpenAI-compatible chat completions"
    }

    async fn generate(&self, request: OracleRequest) -> Result<OracleResponse, OracleError> {
        let params = &request.parameters;
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_prompt,
        });

        let body = ChatRequest {
            model: params.model.as_deref().unwrap_or(&self.config.default_model),
            messages,
            max_tokens: params.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: params.temperature,
        };

        let mut call = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .json(&body);
        if let Some(key) = self.config.get_api_key() {
            call = call.bearer_auth(key);
        }
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
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        let choice = parsed.choices.into_iter().next().ok_or(OracleError::EmptyResponse)?;
        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }

        Ok(OracleResponse {
            content: text,
            stop_reason: choice
                .finish_reason
                .as_deref()
                .map_or(StopReason::EndTurn, StopReason::from_api),
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }

    async fn health_check(&self) -> Result<HealthStatus, OracleError> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url.trim_end_matches('/')))
            .send()
            .await;
        Ok(match response {
            Ok(r) if r.status().is_success() => HealthStatus::Healthy,
            _ => HealthStatus::Unavailable,
        })
    }
}
