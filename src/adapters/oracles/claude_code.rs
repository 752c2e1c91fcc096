//! Claude Code CLI oracle.
//!
//! Spawns `claude --print --output-format text` once per request.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::domain::ports::{HealthStatus, LlmOracle, OracleError, OracleRequest, OracleResponse};

/// Settings for the `claude` CLI oracle.
#[derive(Debug, Clone)]
pub struct ClaudeCodeConfig {
    /// Path to claude CLI binary
    pub binary_path: String,
    /// Model passed with `--model`, if any
    pub default_model: Option<String>,
    /// Process timeout in seconds
    pub timeout_secs: u64,
    /// Additional CLI flags
    pub extra_flags: Vec<String>,
}

impl Default for ClaudeCodeConfig {
    fn default() -> Self {
        Self {
            binary_path: "claude".to_string(),
            default_model: None,
            timeout_secs: 300,
            extra_flags: vec![],
        }
    }
}

/// Oracle that shells out to the `claude` CLI.
pub struct ClaudeCodeOracle {
    config: ClaudeCodeConfig,
}

impl ClaudeCodeOracle {
    /// Oracle with `config`
    pub const fn new(config: ClaudeCodeConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, request: &OracleRequest) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format".to_string(),
            "text".to_string(),
            "--max-turns".to_string(),
            "1".to_string(),
        ];

        if let Some(model) = request
            .parameters
            .model
            .as_ref()
            .or(self.config.default_model.as_ref())
        {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        if !request.system_prompt.is_empty() {
            args.push("--system-prompt".to_string());
            args.push(request.system_prompt.clone());
        }

        args.extend(self.config.extra_flags.iter().cloned());
        args.push(request.user_prompt.clone());
        args
    }
}

#[async_trait]
impl LlmOracle for ClaudeCodeOracle {
    fn oracle_id(&self) -> &'static str {
        "claude-code"
    }

    fn oracle_name(&self) -> &'static str {
        "Claude Code CLI"
    }

    async fn generate(&self, request: OracleRequest) -> Result<OracleResponse, OracleError> {
        let timeout_secs = request
            .parameters
            .timeout_secs
            .unwrap_or(self.config.timeout_secs);

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.args(self.build_args(&request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(binary = %self.config.binary_path, prompt_len = request.user_prompt.len(), "Spawning Claude Code");

        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
            .await
            .map_err(|_| OracleError::Timeout(timeout_secs))?
            .map_err(|e| OracleError::Unavailable(format!("Failed to execute Claude Code: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OracleError::ExecutionFailed(format!(
                "Claude Code exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(OracleResponse::text(text))
    }

    async fn health_check(&self) -> Result<HealthStatus, OracleError> {
        let status = Command::new(&self.config.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        Ok(match status {
            Ok(s) if s.success() => HealthStatus::Healthy,
            _ => HealthStatus::Unavailable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::GenerationParameters;

    #[test]
    fn test_build_args_puts_prompt_last() {
        let oracle = ClaudeCodeOracle::new(ClaudeCodeConfig::default());
        let request = OracleRequest::new("be terse", "write a spec").with_parameters(
            GenerationParameters {
                model: Some("sonnet".to_string()),
                ..Default::default()
            },
        );
        let args = oracle.build_args(&request);
        assert_eq!(args.last().map(String::as_str), Some("write a spec"));
        assert!(args.windows(2).any(|w| w == ["--model", "sonnet"]));
        assert!(args.windows(2).any(|w| w == ["--system-prompt", "be terse"]));
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        let oracle = ClaudeCodeOracle::new(ClaudeCodeConfig::default());
        let args = oracle.build_args(&OracleRequest::new("", "hi"));
        assert!(!args.iter().any(|a| a == "--system-prompt"));
        assert!(!args.iter().any(|a| a == "--model"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let oracle = ClaudeCodeOracle::new(ClaudeCodeConfig {
            binary_path: "/nonexistent/specforge-claude".to_string(),
            ..Default::default()
        });
        let err = oracle.generate(OracleRequest::new("", "hi")).await.unwrap_err();
        assert!(matches!(err, OracleError::Unavailable(_)));
        assert_eq!(oracle.health_check().await.unwrap(), HealthStatus::Unavailable);
    }
}
