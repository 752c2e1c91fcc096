//! Configuration model, deserialized from layered YAML and environment sources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Main configuration structure for specforge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Text-generation oracle settings
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Specification / step-graph generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Validate/refine loop settings
    #[serde(default)]
    pub refine: RefineConfig,

    /// Code executor settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which oracle backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleProvider {
    /// The local `claude` CLI
    #[default]
    ClaudeCode,
    /// Anthropic Messages API
    AnthropicApi,
    /// Any `/chat/completions` server
    OpenaiCompatible,
    /// Scripted responses, for tests and dry runs
    Mock,
}

impl OracleProvider {
    /// Every provider, in display order
    pub const ALL: [Self; 4] = [
        Self::ClaudeCode,
        Self::AnthropicApi,
        Self::OpenaiCompatible,
        Self::Mock,
    ];

    /// Config spelling of the provider
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude_code",
            Self::AnthropicApi => "anthropic_api",
            Self::OpenaiCompatible => "openai_compatible",
            Self::Mock => "mock",
        }
    }

    /// Parse a provider name, accepting `-` for `_` and any case
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|p| p.as_str() == normalized)
    }
}

impl fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OracleConfig {
    /// Backend to construct
    #[serde(default)]
    pub provider: OracleProvider,

    /// Model identifier passed to API providers
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on generated tokens per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature, `0.0..=2.0`
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-call timeout in seconds
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,

    /// Override for the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Path to the `claude` CLI for the `claude_code` provider
    #[serde(default = "default_claude_path")]
    pub claude_code_path: String,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_temperature() -> f32 {
    0.2
}

const fn default_oracle_timeout() -> u64 {
    300
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_claude_path() -> String {
    "claude".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_oracle_timeout(),
            base_url: None,
            api_key_env: default_api_key_env(),
            claude_code_path: default_claude_path(),
        }
    }
}

/// Generation-with-repair configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Oracle calls allowed per artifact, shared across failure categories
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Produce a step graph between the specification and the logic
    #[serde(default = "default_true")]
    pub step_graph: bool,

    /// Where the last raw response of an exhausted generation is archived
    #[serde(default = "default_failure_dir")]
    pub failure_dir: PathBuf,

    /// Directory with schema overrides; bundled schemas are used when unset
    #[serde(default)]
    pub schemas_dir: Option<PathBuf>,
}

const fn default_max_attempts() -> u32 {
    4
}

const fn default_true() -> bool {
    true
}

fn default_failure_dir() -> PathBuf {
    PathBuf::from(".specforge/failures")
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            step_graph: true,
            failure_dir: default_failure_dir(),
            schemas_dir: None,
        }
    }
}

/// Validate/refine loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RefineConfig {
    /// Number of oracle refinements after the initial validation
    #[serde(default = "default_max_refine")]
    pub max_refine_attempts: u32,
}

const fn default_max_refine() -> u32 {
    3
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_refine_attempts: default_max_refine(),
        }
    }
}

/// Sandboxed executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    /// Python interpreter used to run candidate code
    #[serde(default = "default_python")]
    pub python: String,

    /// Wall-clock limit per run, in seconds
    #[serde(default = "default_executor_timeout")]
    pub timeout_secs: u64,

    /// Reject snippets that reference dangerous builtins or modules
    #[serde(default = "default_true")]
    pub enable_security: bool,
}

fn default_python() -> String {
    "python3".to_string()
}

const fn default_executor_timeout() -> u64 {
    10
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            timeout_secs: default_executor_timeout(),
            enable_security: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling JSON log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
