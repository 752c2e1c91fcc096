//! The two artifact kinds the repair driver produces.

use serde_json::Value;

use crate::domain::models::{PredicateIds, Specification, StepGraph, ValidationIssue};
use crate::services::repair_driver::ArtifactSpec;
use crate::services::schema_registry::{SPECIFICATION_SCHEMA, STEP_GRAPH_SCHEMA};
use crate::services::spec_validator::SpecValidator;
use crate::services::step_graph_validator::StepGraphValidator;

/// Specification checked by [`SpecValidator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecificationArtifact;

impl ArtifactSpec for SpecificationArtifact {
    type Artifact = Specification;

    fn kind(&self) -> &'static str {
        "specification"
    }

    fn schema_name(&self) -> &'static str {
        SPECIFICATION_SCHEMA
    }

    fn construct(&self, value: Value) -> Result<Specification, String> {
        Specification::from_value(value).map_err(|e| format!("Invalid specification structure: {e}"))
    }

    fn check(&self, artifact: &mut Specification) -> Result<Vec<ValidationIssue>, String> {
        SpecValidator::validate(artifact).map_err(|e| e.to_string())
    }
}

/// Step graph conditioned on a specification's predicate ids.
#[derive(Debug, Clone)]
pub struct StepGraphArtifact {
    predicate_ids: PredicateIds,
}

impl StepGraphArtifact {
    /// Check against the given predicate ids
    pub fn new(predicate_ids: PredicateIds) -> Self {
        Self { predicate_ids }
    }

    /// Check against the predicate ids of `spec`
    pub fn for_spec(spec: &Specification) -> Self {
        Self::new(spec.predicate_ids())
    }
}

impl ArtifactSpec for StepGraphArtifact {
    type Artifact = StepGraph;

    fn kind(&self) -> &'static str {
        "step_graph"
    }

    fn schema_name(&self) -> &'static str {
        STEP_GRAPH_SCHEMA
    }

    fn construct(&self, value: Value) -> Result<StepGraph, String> {
        StepGraph::from_value(value).map_err(|e| format!("Invalid step graph structure: {e}"))
    }

    fn check(&self, artifact: &mut StepGraph) -> Result<Vec<ValidationIssue>, String> {
        StepGraphValidator::validate(artifact, &self.predicate_ids).map_err(|e| e.to_string())?;

        if artifact.default_order_if_empty() {
            tracing::debug!(steps = artifact.steps.len(), "Step order defaulted to declaration order");
        }
        let duplicates = artifact.duplicate_order_entries();
        if !duplicates.is_empty() {
            return Err(format!("Duplicate ids in order: {}", duplicates.join(", ")));
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_graph_order_is_defaulted() {
        let artifact = StepGraphArtifact::new(PredicateIds::default());
        let mut graph = artifact
            .construct(json!({"steps": [{"id": "A", "intent": "a"}, {"id": "B", "intent": "b"}]}))
            .unwrap();
        artifact.check(&mut graph).unwrap();
        assert_eq!(graph.order, vec!["A", "B"]);
    }

    #[test]
    fn test_step_graph_check_reports_unknown_refs() {
        let artifact = StepGraphArtifact::new(PredicateIds::default());
        let mut graph = artifact
            .construct(json!({"steps": [{"id": "A", "intent": "a", "pre_refs": ["P1"]}]}))
            .unwrap();
        let err = artifact.check(&mut graph).unwrap_err();
        assert_eq!(err, "Step A unknown pre_ref P1");
    }

    #[test]
    fn test_specification_check_returns_aggregated_errors() {
        let mut spec = SpecificationArtifact.construct(json!({"main_function": {"name": "f"}})).unwrap();
        let err = SpecificationArtifact.check(&mut spec).unwrap_err();
        assert!(err.contains("At least one pre predicate required"));
        assert!(err.contains("At least one post predicate required"));
    }

    #[test]
    fn test_construct_error_is_message() {
        let err = SpecificationArtifact
            .construct(json!({"spec_version": "two"}))
            .unwrap_err();
        assert!(err.starts_with("Invalid specification structure"));
    }
}
