//! Layered configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory
pub const CONFIG_DIR: &str = ".specforge";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Attempt budget below one
    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    /// Token limit below one
    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    /// Temperature outside 0.0 to 2.0
    #[error("Invalid temperature: {0}. Must be between 0.0 and 2.0")]
    InvalidTemperature(f32),

    /// Named timeout below one second
    #[error("Invalid timeout for {0}: must be at least 1 second")]
    InvalidTimeout(&'static str),

    /// Unknown log level
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown log format
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown rotation policy
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    /// Any other invalid setting
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .specforge/config.yaml
    /// 3. .specforge/local.yaml
    /// 4. Environment variables (SPECFORGE_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`ConfigLoader::load`] with `project_dir` as the root.
    pub fn load_from(project_dir: &Path) -> Result<Config> {
        let dir = project_dir.join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("SPECFORGE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("SPECFORGE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.generation.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.generation.max_attempts));
        }

        if config.oracle.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(config.oracle.max_tokens));
        }

        if !(0.0..=2.0).contains(&config.oracle.temperature) {
            return Err(ConfigError::InvalidTemperature(config.oracle.temperature));
        }

        if config.oracle.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("oracle"));
        }

        if config.executor.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("executor"));
        }

        if config.executor.python.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "executor.python cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::OracleProvider;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.generation.max_attempts, 4);
        assert_eq!(config.refine.max_refine_attempts, 3);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
oracle:
  provider: anthropic_api
  temperature: 0.0
generation:
  max_attempts: 2
  step_graph: false
logging:
  level: debug
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(config.oracle.provider, OracleProvider::AnthropicApi);
        assert_eq!(config.generation.max_attempts, 2);
        assert!(!config.generation.step_graph);
        assert_eq!(config.refine.max_refine_attempts, 3);
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_attempts() {
        let mut config = Config::default();
        config.generation.max_attempts = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxAttempts(0))
        ));
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogFormat(format)) => assert_eq!(format, "xml"),
            other => panic!("Expected InvalidLogFormat error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_temperature_range() {
        let mut config = Config::default();
        config.oracle.temperature = 3.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTemperature(_))
        ));
    }

    #[test]
    fn test_zero_refine_budget_is_allowed() {
        let mut config = Config::default();
        config.refine.max_refine_attempts = 0;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.yaml"),
            "generation:\n  max_attempts: 5\nlogging:\n  level: info\n  format: json\n",
        )
        .unwrap();
        std::fs::write(config_dir.join("local.yaml"), "logging:\n  level: debug\n").unwrap();

        let config = temp_env::with_vars(
            [("SPECFORGE_REFINE__MAX_REFINE_ATTEMPTS", Some("7"))],
            || ConfigLoader::load_from(dir.path()),
        )
        .unwrap();

        assert_eq!(config.generation.max_attempts, 5);
        assert_eq!(config.logging.level, "debug", "local.yaml should win");
        assert_eq!(config.logging.format, "json", "base value should persist");
        assert_eq!(config.refine.max_refine_attempts, 7, "env should win");
    }

    #[test]
    fn test_invalid_file_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "logging:\n  level: loud\n").unwrap();
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }
}
