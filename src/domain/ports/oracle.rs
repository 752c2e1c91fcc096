//! Oracle port
//!
//! Abstraction over the text-generation backend. The pipeline treats every
//! oracle as unreliable: malformed, schema-invalid or semantically invalid
//! output is expected and drives the repair loops.
//!
//! Implementations:
//! - Claude Code CLI (default, no API key needed)
//! - Anthropic Messages API
//! - OpenAI-compatible chat completion endpoints
//! - Scripted mock for tests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Prompt pair sent to an oracle.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    /// Instructions that stay fixed across repair attempts
    pub system_prompt: String,
    /// The task or repair request
    pub user_prompt: String,
    /// Sampling and limit overrides
    pub parameters: GenerationParameters,
}

impl OracleRequest {
    /// Request with default parameters
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            parameters: GenerationParameters::default(),
        }
    }

    /// Replace the generation parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Parameters for controlling generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParameters {
    /// Model override; adapters fall back to their configured model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Upper bound on generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Per-call timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: Some(4096),
            temperature: Some(0.2),
            timeout_secs: Some(300),
        }
    }
}

/// Raw text returned by an oracle.
#[derive(Debug, Clone)]
pub struct OracleResponse {
    /// Generated text
    pub content: String,
    /// Why generation stopped
    pub stop_reason: StopReason,
    /// Token accounting, when the backend reports it
    pub usage: Option<TokenUsage>,
}

impl OracleResponse {
    /// A complete response with no usage data
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            stop_reason: StopReason::EndTurn,
            usage: None,
        }
    }
}

/// Reason why generation stopped
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the response
    EndTurn,
    /// Hit the token limit
    MaxTokens,
    /// Any other backend-specific reason
    Other(String),
}

impl StopReason {
    /// Map Anthropic and OpenAI stop reasons
    pub fn from_api(reason: &str) -> Self {
        match reason {
            "end_turn" | "stop_sequence" | "stop" => Self::EndTurn,
            "max_tokens" | "length" => Self::MaxTokens,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input_tokens: u32,
    /// Generated tokens
    pub output_tokens: u32,
}

/// Health status of an oracle backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Ready to serve requests
    Healthy,
    /// Cannot serve requests
    Unavailable,
}

/// Error types for oracle operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    /// Required configuration, such as an API key, is missing
    #[error("Oracle not configured: {0}")]
    NotConfigured(String),

    /// The backend cannot be reached or started
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded its timeout, in seconds
    #[error("Oracle call timed out after {0}s")]
    Timeout(u64),

    /// Non-success HTTP status
    #[error("Oracle API error ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, with secrets redacted
        body: String,
    },

    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// The backend returned no text
    #[error("Oracle returned an empty response")]
    EmptyResponse,

    /// The response could not be decoded
    #[error("Invalid oracle response: {0}")]
    InvalidResponse(String),

    /// A CLI backend exited unsuccessfully
    #[error("Oracle execution failed: {0}")]
    ExecutionFailed(String),
}

/// Port trait for text-generation backends.
#[async_trait]
pub trait LlmOracle: Send + Sync {
    /// Stable identifier, e.g. `anthropic-api`
    fn oracle_id(&self) -> &str;

    /// Human-readable name
    fn oracle_name(&self) -> &str;

    /// Send one prompt pair and wait for the complete response.
    ///
    /// # Errors
    /// - `OracleError::Unavailable` - backend cannot be reached
    /// - `OracleError::Timeout` - call exceeded its timeout
    /// - `OracleError::Api` - backend answered with a non-success status
    /// - `OracleError::EmptyResponse` - backend answered with no text
    async fn generate(&self, request: OracleRequest) -> Result<OracleResponse, OracleError>;

    async fn health_check(&self) -> Result<HealthStatus, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_from_api() {
        assert_eq!(StopReason::from_api("end_turn"), StopReason::EndTurn);
        assert_eq!(StopReason::from_api("length"), StopReason::MaxTokens);
        assert_eq!(
            StopReason::from_api("refusal"),
            StopReason::Other("refusal".to_string())
        );
    }
}
