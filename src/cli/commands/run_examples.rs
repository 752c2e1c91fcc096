//! Implementation of the `specforge run-examples` command.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::{OracleRegistry, PythonSubprocessExecutor};
use crate::cli::output::{create_spinner, output, report_summary, report_table, CommandOutput};
use crate::cli::read_document;
use crate::domain::models::{Config, Specification, ValidationReport};
use crate::services::{PipelineSettings, RefineLoop, Termination, TestHarness};

/// Arguments for `run-examples`.
#[derive(Args, Debug)]
pub struct RunExamplesArgs {
    /// Specification file (JSON or YAML)
    #[arg(short, long)]
    pub spec: PathBuf,

    /// Python source implementing the specified function
    #[arg(short, long)]
    pub code: PathBuf,

    /// Ask the configured oracle for up to N refinements on failure
    #[arg(long, value_name = "N")]
    pub refine: Option<u32>,

    /// Where to write refined code (defaults to printing it)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Result of `run-examples`.
#[derive(Debug, serde::Serialize)]
pub struct RunExamplesOutput {
    /// Function under test
    pub function: String,
    /// Final validation report
    pub report: ValidationReport,
    /// Refinements used, with `--refine`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinements: Option<u32>,
    /// Why refinement stopped, with `--refine`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
    /// Refined code when not written to a file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined_code: Option<String>,
    /// File the refined code was written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<PathBuf>,
}

impl CommandOutput for RunExamplesOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Function `{}`", self.function),
            report_table(&self.report),
            report_summary(&self.report),
        ];
        if let Some(n) = self.refinements {
            lines.push(format!("Refinements used: {n}"));
        }
        for suggestion in &self.report.suggestions {
            lines.push(format!("  - {suggestion}"));
        }
        if let Some(path) = &self.written_to {
            lines.push(format!("Refined code written to {}", path.display()));
        } else if let Some(code) = &self.refined_code {
            lines.push(String::new());
            lines.push(code.clone());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run `run-examples`
pub async fn execute(args: RunExamplesArgs, config: &Config, json_mode: bool) -> Result<()> {
    let spec = Specification::from_value(read_document(&args.spec).await?)
        .with_context(|| format!("{} is not a specification", args.spec.display()))?;
    let code = tokio::fs::read_to_string(&args.code)
        .await
        .with_context(|| format!("Failed to read {}", args.code.display()))?;

    let harness = TestHarness::new(Arc::new(PythonSubprocessExecutor::new(&config.executor)));
    let spinner = create_spinner(format!("Running examples for `{}`", spec.name()), json_mode);

    let result = if let Some(max_refine) = args.refine {
        let oracle = OracleRegistry::new(config.oracle.clone()).create()?;
        let settings = PipelineSettings::from(config);
        let outcome = RefineLoop::new(oracle, harness)
            .with_parameters(settings.parameters)
            .run(&code, "", &spec, max_refine)
            .await;

        let written_to = match &args.out {
            Some(path) if outcome.attempts_used > 0 => {
                tokio::fs::write(path, &outcome.code)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                Some(path.clone())
            }
            _ => None,
        };
        RunExamplesOutput {
            function: spec.name().to_string(),
            refinements: Some(outcome.attempts_used),
            termination: Some(outcome.termination),
            refined_code: (outcome.attempts_used > 0 && written_to.is_none())
                .then_some(outcome.code),
            written_to,
            report: outcome.validation_report,
        }
    } else {
        RunExamplesOutput {
            function: spec.name().to_string(),
            report: harness.validate(&code, &spec).await,
            refinements: None,
            termination: None,
            refined_code: None,
            written_to: None,
        }
    };
    spinner.finish_and_clear();

    let passed = result.report.is_valid;
    output(&result, json_mode);
    if !passed {
        bail!(
            "{}/{} examples passing",
            result.report.passed_count,
            result.report.total_tests
        );
    }
    Ok(())
}
