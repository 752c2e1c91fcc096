//! Oracle registry and factory.

use std::sync::Arc;

use crate::domain::models::{OracleConfig, OracleProvider};
use crate::domain::ports::{LlmOracle, OracleError};

use super::anthropic_api::{AnthropicApiConfig, AnthropicApiOracle};
use super::claude_code::{ClaudeCodeConfig, ClaudeCodeOracle};
use super::mock::MockOracle;
use super::openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleOracle};

/// Builds oracles from the `oracle` config section.
pub struct OracleRegistry {
    config: OracleConfig,
}

impl OracleRegistry {
    /// Registry over `config`
    pub const fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    /// Oracle for the configured provider
    pub fn create(&self) -> Result<Arc<dyn LlmOracle>, OracleError> {
        self.create_by_provider(self.config.provider)
    }

    /// Oracle for `provider`, using the rest of the config
    pub fn create_by_provider(
        &self,
        provider: OracleProvider,
    ) -> Result<Arc<dyn LlmOracle>, OracleError> {
        let config = &self.config;
        tracing::debug!(%provider, model = %config.model, "Creating oracle");
        let oracle: Arc<dyn LlmOracle> = match provider {
            OracleProvider::ClaudeCode => Arc::new(ClaudeCodeOracle::new(ClaudeCodeConfig {
                binary_path: config.claude_code_path.clone(),
                default_model: None,
                timeout_secs: config.timeout_secs,
                extra_flags: vec![],
            })),
            OracleProvider::AnthropicApi => {
                let defaults = AnthropicApiConfig::default();
                Arc::new(AnthropicApiOracle::new(AnthropicApiConfig {
                    api_key_env: config.api_key_env.clone(),
                    base_url: config.base_url.clone().unwrap_or(defaults.base_url),
                    default_model: config.model.clone(),
                    timeout_secs: config.timeout_secs,
                    max_tokens: config.max_tokens,
                    ..defaults
                })?)
            }
            OracleProvider::OpenaiCompatible => {
                let defaults = OpenAiCompatibleConfig::default();
                Arc::new(OpenAiCompatibleOracle::new(OpenAiCompatibleConfig {
                    api_key_env: config.api_key_env.clone(),
                    base_url: config.base_url.clone().unwrap_or(defaults.base_url),
                    default_model: config.model.clone(),
                    timeout_secs: config.timeout_secs,
                    max_tokens: config.max_tokens,
                    ..defaults
                })?)
            }
            OracleProvider::Mock => Arc::new(MockOracle::new()),
        };
        Ok(oracle)
    }

    /// Names of every supported provider
    pub fn available_providers() -> Vec<&'static str> {
        OracleProvider::ALL.iter().map(|p| p.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_by_provider() {
        let registry = OracleRegistry::new(OracleConfig::default());

        let claude = registry.create_by_provider(OracleProvider::ClaudeCode).unwrap();
        assert_eq!(claude.oracle_id(), "claude-code");

        let mock = registry.create_by_provider(OracleProvider::Mock).unwrap();
        assert_eq!(mock.oracle_id(), "mock");

        let api = registry.create_by_provider(OracleProvider::AnthropicApi).unwrap();
        assert_eq!(api.oracle_id(), "anthropic-api");
    }

    #[test]
    fn test_create_uses_configured_provider() {
        let registry = OracleRegistry::new(OracleConfig {
            provider: OracleProvider::OpenaiCompatible,
            base_url: Some("http://localhost:11434/v1".to_string()),
            ..Default::default()
        });
        assert_eq!(registry.create().unwrap().oracle_id(), "openai-compatible");
    }

    #[test]
    fn test_available_providers() {
        let providers = OracleRegistry::available_providers();
        assert!(providers.contains(&"claude_code"));
        assert!(providers.contains(&"mock"));
        assert_eq!(providers.len(), 4);
    }
}
