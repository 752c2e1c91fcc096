//! Implementation of the `specforge check-spec` command.

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::{issues_table, output, CommandOutput};
use crate::cli::{load_schemas, read_document};
use crate::domain::models::{Config, IssueCode, Specification, ValidationIssue};
use crate::services::schema_registry::SPECIFICATION_SCHEMA;
use crate::services::{SchemaRegistry, SpecValidator};

/// Arguments for `check-spec`.
#[derive(Args, Debug)]
pub struct CheckSpecArgs {
    /// Specification file (JSON or YAML)
    pub file: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Result of `check-spec`.
#[derive(Debug, serde::Serialize)]
pub struct CheckSpecOutput {
    /// Specification file checked
    pub file: PathBuf,
    /// Whether no blocking issue was found
    pub valid: bool,
    /// Signature of the main function, if present
    pub function: Option<String>,
    /// Blocking issues
    pub errors: Vec<ValidationIssue>,
    /// Non-blocking issues
    pub warnings: Vec<ValidationIssue>,
}

impl CommandOutput for CheckSpecOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![];
        let verdict = if self.valid { "valid" } else { "INVALID" };
        match &self.function {
            Some(name) => lines.push(format!("{}: {verdict} (function `{name}`)", self.file.display())),
            None => lines.push(format!("{}: {verdict}", self.file.display())),
        }
        let issues: Vec<ValidationIssue> =
            self.errors.iter().chain(&self.warnings).cloned().collect();
        if !issues.is_empty() {
            lines.push(issues_table(&issues));
        }
        lines.push(format!(
            "{} error(s), {} warning(s)",
            self.errors.len(),
            self.warnings.len()
        ));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Outcome of checking one specification document.
#[derive(Debug)]
pub struct SpecCheck {
    /// Parsed specification, when it passed the schema
    pub spec: Option<Specification>,
    /// Blocking issues
    pub errors: Vec<ValidationIssue>,
    /// Non-blocking issues
    pub warnings: Vec<ValidationIssue>,
}

/// Schema check first; the semantic validator only sees schema-valid input.
pub fn check(value: serde_json::Value, schemas: &SchemaRegistry) -> Result<SpecCheck> {
    let schema_errors = schemas.validate(SPECIFICATION_SCHEMA, &value)?;
    if !schema_errors.is_empty() {
        return Ok(SpecCheck {
            spec: None,
            errors: schema_errors
                .into_iter()
                .map(|e| ValidationIssue::error(IssueCode::StructureError, "schema", e))
                .collect(),
            warnings: Vec::new(),
        });
    }

    match Specification::from_value(value) {
        Ok(spec) => {
            let (errors, warnings) = SpecValidator::collect(&spec);
            Ok(SpecCheck {
                spec: Some(spec),
                errors,
                warnings,
            })
        }
        Err(e) => Ok(SpecCheck {
            spec: None,
            errors: vec![ValidationIssue::error(
                IssueCode::StructureError,
                "<root>",
                format!("Invalid specification structure: {e}"),
            )],
            warnings: Vec::new(),
        }),
    }
}

/// Run `check-spec`
pub async fn execute(args: CheckSpecArgs, config: &Config, json_mode: bool) -> Result<()> {
    let value = read_document(&args.file).await?;
    let schemas = load_schemas(config)?;
    let SpecCheck {
        spec,
        errors,
        warnings,
    } = check(value, &schemas)?;

    let valid = errors.is_empty() && !(args.strict && !warnings.is_empty());
    let result = CheckSpecOutput {
        file: args.file,
        valid,
        function: spec.map(|s| s.name().to_string()),
        errors,
        warnings,
    };
    output(&result, json_mode);

    if !valid {
        bail!("specification check failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::builtin().unwrap()
    }

    #[test]
    fn test_schema_failure_skips_semantic_checks() {
        let result = check(json!({"examples": "nope"}), &schemas()).unwrap();
        assert!(result.spec.is_none());
        assert!(!result.errors.is_empty());
        assert!(result
            .errors
            .iter()
            .all(|e| e.code == IssueCode::StructureError));
    }

    #[test]
    fn test_semantic_errors_are_reported() {
        let value = json!({
            "main_function": {"name": "f", "signature": {"return_type": "int"}},
            "types": {"parameters": [{"name": "x", "type": "int"}]},
            "pre": [{"id": "P1", "expr": "x > 0"}],
            "post": [{"id": "P1", "expr": "result > 0"}],
            "examples": {"positive": [{"id": "E1", "inputs": {"x": 1}, "output": 1}]}
        });
        let result = check(value, &schemas()).unwrap();
        assert_eq!(result.spec.as_ref().map(Specification::name), Some("f"));
        assert!(result.errors.iter().any(|e| e.code == IssueCode::IdConflict));
    }
}
