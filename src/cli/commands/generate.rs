//! Implementation of the `specforge generate` command.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::{FileFailureArchive, OracleRegistry, PythonSubprocessExecutor};
use crate::cli::load_schemas;
use crate::cli::output::{create_spinner, issues_table, output, report_summary, CommandOutput};
use crate::domain::models::{Config, OracleProvider};
use crate::services::{CodegenPipeline, PipelineOutcome, PipelineSettings, PipelineStatus};

/// Arguments for `generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Natural-language requirement
    #[arg(required_unless_present = "file")]
    pub requirement: Option<String>,

    /// Read the requirement from a file instead
    #[arg(short, long, conflicts_with = "requirement")]
    pub file: Option<PathBuf>,

    /// Oracle provider override (claude_code, anthropic_api, openai_compatible, mock)
    #[arg(long)]
    pub provider: Option<String>,

    /// Skip the step graph and ask the oracle for free-form logic
    #[arg(long)]
    pub no_step_graph: bool,

    /// Oracle calls allowed per structured artifact
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Refinements allowed after the first validation
    #[arg(long)]
    pub max_refine_attempts: Option<u32>,

    /// Directory for the generated artifacts
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,
}

/// Result of `generate`.
#[derive(Debug, serde::Serialize)]
pub struct GenerateOutput {
    /// Pipeline outcome
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
    /// Files written to `--out-dir`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub written: Vec<PathBuf>,
}

impl CommandOutput for GenerateOutput {
    fn to_human(&self) -> String {
        let outcome = &self.outcome;
        let mut lines = vec![format!("Session {}", outcome.session_id)];
        match &outcome.status {
            PipelineStatus::Success => lines.push("Status: success".to_string()),
            PipelineStatus::PartialSuccess { detail } => {
                lines.push(format!("Status: partial success ({detail})"));
            }
            PipelineStatus::HardFailure { stage, error } => {
                lines.push(format!("Status: failed at {stage}"));
                lines.push(format!("  {error}"));
            }
        }
        if let Some(spec) = &outcome.specification {
            lines.push(format!("Function: {}", spec.signature_line()));
        }
        if !outcome.warnings.is_empty() {
            lines.push(issues_table(&outcome.warnings));
        }
        if let Some(report) = &outcome.report {
            lines.push(format!(
                "{} after {} refinement(s)",
                report_summary(report),
                outcome.attempts_used
            ));
        }
        if self.written.is_empty() {
            if let Some(code) = &outcome.code {
                lines.push(String::new());
                lines.push(code.clone());
            }
        } else {
            lines.push("Wrote:".to_string());
            lines.extend(self.written.iter().map(|p| format!("  - {}", p.display())));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn apply_overrides(args: &GenerateArgs, config: &mut Config) -> Result<()> {
    if let Some(name) = &args.provider {
        config.oracle.provider = OracleProvider::parse(name)
            .with_context(|| format!("Unknown oracle provider '{name}'"))?;
    }
    if args.no_step_graph {
        config.generation.step_graph = false;
    }
    if let Some(n) = args.max_attempts {
        config.generation.max_attempts = n;
    }
    if let Some(n) = args.max_refine_attempts {
        config.refine.max_refine_attempts = n;
    }
    Ok(())
}

async fn write_artifacts(outcome: &PipelineOutcome, dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut files: Vec<(String, String)> = Vec::new();
    if let Some(spec) = &outcome.specification {
        files.push(("specification.json".to_string(), spec.to_json_pretty()?));
    }
    if let Some(graph) = &outcome.step_graph {
        files.push(("step_graph.json".to_string(), graph.to_json_pretty()?));
    }
    if let Some(logic) = &outcome.logic {
        files.push(("logic.txt".to_string(), logic.clone()));
    }
    if let Some(code) = &outcome.code {
        let name = outcome
            .specification
            .as_ref()
            .map(|s| s.name())
            .filter(|n| !n.is_empty())
            .unwrap_or("solution");
        files.push((format!("{name}.py"), code.clone()));
    }
    if let Some(report) = &outcome.report {
        files.push(("report.json".to_string(), serde_json::to_string_pretty(report)?));
    }

    let mut written = Vec::with_capacity(files.len());
    for (name, body) in files {
        let path = dir.join(name);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Run `generate`
pub async fn execute(args: GenerateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let requirement = match (&args.requirement, &args.file) {
        (_, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (Some(text), None) => text.clone(),
        (None, None) => bail!("a requirement or --file is needed"),
    };

    let mut config = config.clone();
    apply_overrides(&args, &mut config)?;

    let oracle = OracleRegistry::new(config.oracle.clone()).create()?;
    let pipeline = CodegenPipeline::new(
        oracle,
        Arc::new(PythonSubprocessExecutor::new(&config.executor)),
        load_schemas(&config)?,
        Arc::new(FileFailureArchive::new(config.generation.failure_dir.clone())),
        PipelineSettings::from(&config),
    );

    let spinner = create_spinner("Generating", json_mode);
    let outcome = pipeline.run(&requirement).await;
    spinner.finish_and_clear();

    let written = match &args.out_dir {
        Some(dir) => write_artifacts(&outcome, dir).await?,
        None => Vec::new(),
    };
    let status = outcome.status.clone();
    output(&GenerateOutput { outcome, written }, json_mode);

    match status {
        PipelineStatus::Success => Ok(()),
        PipelineStatus::PartialSuccess { detail } => bail!("generated code is incomplete: {detail}"),
        PipelineStatus::HardFailure { stage, .. } => bail!("generation failed at {stage}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: GenerateArgs,
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let parsed = Harness::parse_from([
            "generate",
            "sum a list",
            "--provider",
            "anthropic-api",
            "--no-step-graph",
            "--max-attempts",
            "2",
        ]);
        let mut config = Config::default();
        apply_overrides(&parsed.args, &mut config).unwrap();
        assert_eq!(config.oracle.provider, OracleProvider::AnthropicApi);
        assert!(!config.generation.step_graph);
        assert_eq!(config.generation.max_attempts, 2);
        assert_eq!(config.refine.max_refine_attempts, 3);
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let parsed = Harness::parse_from(["generate", "x", "--provider", "ollama"]);
        assert!(apply_overrides(&parsed.args, &mut Config::default()).is_err());
    }

    #[tokio::test]
    async fn test_write_artifacts_names_code_after_function() {
        use crate::domain::models::{FunctionSpec, Specification};

        let dir = tempfile::tempdir().unwrap();
        let mut outcome: PipelineOutcome = serde_json::from_value(serde_json::json!({
            "session_id": "00000000-0000-0000-0000-000000000000",
            "status": "success",
            "specification": null,
            "step_graph": null,
            "logic": "1. add",
            "code": "def total(xs):\n    return sum(xs)",
            "explanation": null,
            "report": null,
            "attempts_used": 0,
            "warnings": []
        }))
        .unwrap();
        outcome.specification = Some(Specification {
            main_function: Some(FunctionSpec {
                name: "total".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });

        let written = write_artifacts(&outcome, dir.path()).await.unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["specification.json", "logic.txt", "total.py"]);
    }
}
