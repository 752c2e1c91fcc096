//! Compiled JSON Schemas for generated artifacts.
//!
//! Built once and handed to the repair driver; there is no process-wide
//! schema cache.

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Registry name of the specification schema
pub const SPECIFICATION_SCHEMA: &str = "specification";
/// Registry name of the step graph schema
pub const STEP_GRAPH_SCHEMA: &str = "step_graph";

const SCHEMA_SUFFIX: &str = ".schema.json";

const BUILTIN_SCHEMAS: [(&str, &str); 2] = [
    (
        SPECIFICATION_SCHEMA,
        include_str!("../../schemas/specification.schema.json"),
    ),
    (
        STEP_GRAPH_SCHEMA,
        include_str!("../../schemas/step_graph.schema.json"),
    ),
];

/// Errors from loading or compiling schemas
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No schema under that name
    #[error("Schema not registered: {0}")]
    NotFound(String),

    /// Schema text is not JSON
    #[error("Schema '{name}' is not valid JSON: {message}")]
    Parse {
        /// Registry name
        name: String,
        /// Parser error
        message: String,
    },

    /// Schema JSON is not a valid JSON Schema
    #[error("Schema '{name}' failed to compile: {message}")]
    Compile {
        /// Registry name
        name: String,
        /// Compiler error
        message: String,
    },

    /// Schema directory could not be read
    #[error("Failed to read schema directory {path}: {message}")]
    Io {
        /// Directory that failed
        path: String,
        /// I/O error
        message: String,
    },
}

/// Named, pre-compiled schemas.
pub struct SchemaRegistry {
    schemas: HashMap<String, JSONSchema>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.schemas.keys().collect();
        names.sort();
        f.debug_struct("SchemaRegistry").field("schemas", &names).finish()
    }
}

impl SchemaRegistry {
    /// Registry with no schemas
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// The schemas bundled with the crate.
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut registry = Self::empty();
        for (name, raw) in BUILTIN_SCHEMAS {
            registry.register_str(name, raw)?;
        }
        Ok(registry)
    }

    /// Builtin schemas overridden by every `<name>.schema.json` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let dir = dir.as_ref();
        let io_err = |e: std::io::Error| SchemaError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        };

        let mut registry = Self::builtin()?;
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(SCHEMA_SUFFIX))
                .map(str::to_string)
            else {
                continue;
            };
            let raw = std::fs::read_to_string(&path).map_err(io_err)?;
            registry.register_str(&name, &raw)?;
            tracing::debug!(schema = %name, path = %path.display(), "Loaded schema override");
        }
        Ok(registry)
    }

    /// Parse and register a schema from JSON text
    pub fn register_str(&mut self, name: &str, raw: &str) -> Result<(), SchemaError> {
        let schema: Value = serde_json::from_str(raw).map_err(|e| SchemaError::Parse {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        self.register(name, &schema)
    }

    /// Compile and register a schema, replacing any previous one
    pub fn register(&mut self, name: &str, schema: &Value) -> Result<(), SchemaError> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| SchemaError::Compile {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        self.schemas.insert(name.to_string(), compiled);
        Ok(())
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Every violation of schema `name`, formatted `"<path>: <message>"`.
    ///
    /// Paths are dotted (`steps.0.intent`); a violation at the top level is
    /// reported as `<root>`. An empty list means the instance conforms.
    pub fn validate(&self, name: &str, instance: &Value) -> Result<Vec<String>, SchemaError> {
        let schema = self
            .schemas
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let errors = match schema.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| format!("{}: {}", dotted_path(&e.instance_path.to_string()), e))
                .collect(),
        };
        Ok(errors)
    }
}

fn dotted_path(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        "<root>".to_string()
    } else {
        trimmed.replace('/', ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_registers_both_schemas() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert!(registry.contains(SPECIFICATION_SCHEMA));
        assert!(registry.contains(STEP_GRAPH_SCHEMA));
    }

    #[test]
    fn test_valid_step_graph_has_no_errors() {
        let registry = SchemaRegistry::builtin().unwrap();
        let errors = registry
            .validate(
                STEP_GRAPH_SCHEMA,
                &json!({"steps": [{"id": "S1", "intent": "do"}], "edges": [], "order": ["S1"]}),
            )
            .unwrap();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_errors_carry_dotted_paths() {
        let registry = SchemaRegistry::builtin().unwrap();
        let errors = registry
            .validate(
                STEP_GRAPH_SCHEMA,
                &json!({"steps": [{"id": "S1", "intent": 7}], "edges": [["S1"]]}),
            )
            .unwrap();
        assert!(errors.iter().any(|e| e.starts_with("steps.0.intent: ")), "{errors:?}");
        assert!(errors.iter().any(|e| e.starts_with("edges.0: ")), "{errors:?}");
    }

    #[test]
    fn test_root_errors_use_root_marker() {
        let registry = SchemaRegistry::builtin().unwrap();
        let errors = registry.validate(STEP_GRAPH_SCHEMA, &json!([])).unwrap();
        assert!(errors.iter().all(|e| e.starts_with("<root>: ")), "{errors:?}");
    }

    #[test]
    fn test_specification_schema_accepts_minimal_document() {
        let registry = SchemaRegistry::builtin().unwrap();
        let errors = registry
            .validate(
                SPECIFICATION_SCHEMA,
                &json!({
                    "spec_version": 2,
                    "main_function": {"name": "f", "signature": {"return_type": "int"}},
                    "pre": [{"id": "P1", "expr": "x > 0"}],
                    "post": [{"id": "Q1", "expr": "result > 0"}],
                    "examples": {"positive": [{"id": "E1", "inputs": {"x": 1}, "output": 1}]}
                }),
            )
            .unwrap();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_unknown_schema() {
        let registry = SchemaRegistry::empty();
        assert!(matches!(
            registry.validate("nope", &json!({})),
            Err(SchemaError::NotFound(_))
        ));
    }

    #[test]
    fn test_from_dir_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("step_graph.schema.json"),
            r#"{"type": "object", "required": ["nodes"]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let registry = SchemaRegistry::from_dir(dir.path()).unwrap();
        let errors = registry
            .validate(STEP_GRAPH_SCHEMA, &json!({"steps": []}))
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert!(registry.contains(SPECIFICATION_SCHEMA));
    }

    #[test]
    fn test_invalid_schema_text() {
        let mut registry = SchemaRegistry::empty();
        assert!(matches!(
            registry.register_str("bad", "{not json"),
            Err(SchemaError::Parse { .. })
        ));
    }
}
