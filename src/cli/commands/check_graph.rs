//! Implementation of the `specforge check-graph` command.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::{issues_table, output, CommandOutput};
use crate::cli::{load_schemas, read_document};
use crate::domain::models::{Config, IssueCode, Specification, StepGraph, ValidationIssue};
use crate::services::schema_registry::STEP_GRAPH_SCHEMA;
use crate::services::{LogicSkeleton, SchemaRegistry, StepGraphValidator};

/// Arguments for `check-graph`.
#[derive(Args, Debug)]
pub struct CheckGraphArgs {
    /// Step graph file (JSON or YAML)
    pub file: PathBuf,

    /// Specification whose predicate ids the graph may reference
    #[arg(short, long)]
    pub spec: PathBuf,

    /// Print the logic skeleton derived from a valid graph
    #[arg(long)]
    pub skeleton: bool,
}

/// Result of `check-graph`.
#[derive(Debug, serde::Serialize)]
pub struct CheckGraphOutput {
    /// Step graph file checked
    pub file: PathBuf,
    /// Whether no blocking issue was found
    pub valid: bool,
    /// Number of steps
    pub steps: usize,
    /// Step ids in execution order
    pub order: Vec<String>,
    /// Blocking issues
    pub errors: Vec<ValidationIssue>,
    /// Rendered logic skeleton, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<String>,
}

impl CommandOutput for CheckGraphOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![if self.valid {
            format!(
                "{}: valid ({} step(s), order {})",
                self.file.display(),
                self.steps,
                self.order.join(" -> ")
            )
        } else {
            format!("{}: INVALID", self.file.display())
        }];
        if !self.errors.is_empty() {
            lines.push(issues_table(&self.errors));
        }
        if let Some(skeleton) = &self.skeleton {
            lines.push(String::new());
            lines.push(skeleton.clone());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Schema and semantic checks; a valid graph comes back with its order filled in.
pub fn check(
    value: serde_json::Value,
    spec: &Specification,
    schemas: &SchemaRegistry,
) -> Result<Result<StepGraph, Vec<ValidationIssue>>> {
    let schema_errors = schemas.validate(STEP_GRAPH_SCHEMA, &value)?;
    if !schema_errors.is_empty() {
        return Ok(Err(schema_errors
            .into_iter()
            .map(|e| ValidationIssue::error(IssueCode::StructureError, "schema", e))
            .collect()));
    }

    let mut graph = match StepGraph::from_value(value) {
        Ok(graph) => graph,
        Err(e) => {
            return Ok(Err(vec![ValidationIssue::error(
                IssueCode::StructureError,
                "<root>",
                format!("Invalid step graph structure: {e}"),
            )]))
        }
    };

    let mut errors = StepGraphValidator::collect(&graph, &spec.predicate_ids());
    if errors.is_empty() {
        graph.default_order_if_empty();
        let duplicates = graph.duplicate_order_entries();
        if !duplicates.is_empty() {
            errors.push(ValidationIssue::error(
                IssueCode::OrderInvalid,
                "order",
                format!("Duplicate ids in order: {}", duplicates.join(", ")),
            ));
        }
    }
    Ok(if errors.is_empty() { Ok(graph) } else { Err(errors) })
}

/// Run `check-graph`
pub async fn execute(args: CheckGraphArgs, config: &Config, json_mode: bool) -> Result<()> {
    let spec_value = read_document(&args.spec).await?;
    let spec = Specification::from_value(spec_value)
        .with_context(|| format!("{} is not a specification", args.spec.display()))?;
    let value = read_document(&args.file).await?;
    let schemas = load_schemas(config)?;

    let result = match check(value, &spec, &schemas)? {
        Ok(graph) => CheckGraphOutput {
            file: args.file,
            valid: true,
            steps: graph.steps.len(),
            order: graph.order.clone(),
            errors: Vec::new(),
            skeleton: args
                .skeleton
                .then(|| LogicSkeleton::from_step_graph(&spec, &graph).render()),
        },
        Err(errors) => CheckGraphOutput {
            file: args.file,
            valid: false,
            steps: 0,
            order: Vec::new(),
            errors,
            skeleton: None,
        },
    };
    let valid = result.valid;
    output(&result, json_mode);

    if !valid {
        bail!("step graph check failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Predicate;
    use serde_json::json;

    fn spec() -> Specification {
        Specification {
            pre: vec![Predicate::new("P1", "x > 0")],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_graph_gets_default_order() {
        let schemas = SchemaRegistry::builtin().unwrap();
        let graph = check(
            json!({"steps": [
                {"id": "S1", "intent": "check", "pre_refs": ["P1"]},
                {"id": "S2", "intent": "compute"}
            ]}),
            &spec(),
            &schemas,
        )
        .unwrap()
        .unwrap();
        assert_eq!(graph.order, vec!["S1", "S2"]);
    }

    #[test]
    fn test_unknown_ref_is_reported() {
        let schemas = SchemaRegistry::builtin().unwrap();
        let errors = check(
            json!({"steps": [{"id": "S1", "intent": "check", "post_refs": ["Q9"]}]}),
            &spec(),
            &schemas,
        )
        .unwrap()
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unknown post_ref Q9"));
    }

    #[test]
    fn test_schema_rejects_empty_steps() {
        let schemas = SchemaRegistry::builtin().unwrap();
        let errors = check(json!({"steps": []}), &spec(), &schemas)
            .unwrap()
            .unwrap_err();
        assert!(errors.iter().all(|e| e.code == IssueCode::StructureError));
    }
}
