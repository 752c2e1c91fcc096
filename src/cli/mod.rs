//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::SecretScrubber;
use crate::services::SchemaRegistry;

/// Print a command failure to stderr and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let message = SecretScrubber::scrub(&format!("{err:#}"));
    if json_mode {
        let body = serde_json::json!({ "success": false, "error": message });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {message}", console::style("Error:").red().bold());
    }
    std::process::exit(1);
}

/// Load configuration from `path`, or the default search locations
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Bundled schemas, overridden from `generation.schemas_dir` when set.
pub fn load_schemas(config: &Config) -> Result<Arc<SchemaRegistry>> {
    let registry = match &config.generation.schemas_dir {
        Some(dir) => SchemaRegistry::from_dir(dir)
            .with_context(|| format!("Failed to load schemas from {}", dir.display()))?,
        None => SchemaRegistry::builtin().context("Failed to compile bundled schemas")?,
    };
    Ok(Arc::new(registry))
}

/// Read a JSON or YAML document; `.yaml`/`.yml` files go through serde_yaml.
pub async fn read_document(path: &Path) -> Result<serde_json::Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(&raw).with_context(|| format!("Invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}
