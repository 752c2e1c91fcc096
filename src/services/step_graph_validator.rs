//! Step-graph validator
//!
//! Referential integrity of a step graph against the specification's
//! predicate ids. Pass/fail only: there is no warning tier.

use std::collections::HashSet;
use thiserror::Error;

use crate::domain::models::{IssueCode, PredicateIds, StepGraph, ValidationIssue};

/// Every problem found in a step graph.
///
/// Displays as the issue messages joined by `"; "`.
#[derive(Debug, Clone, Error)]
#[error("{}", .issues.iter().map(|i| i.message.as_str()).collect::<Vec<_>>().join("; "))]
pub struct StepGraphValidationError {
    /// Every blocking issue found
    pub issues: Vec<ValidationIssue>,
}

/// Structural checks on a step graph.
pub struct StepGraphValidator;

impl StepGraphValidator {
    /// Fail if any blocking issue is found
    pub fn validate(graph: &StepGraph, ids: &PredicateIds) -> Result<(), StepGraphValidationError> {
        let issues = Self::collect(graph, ids);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(StepGraphValidationError { issues })
        }
    }

    /// Every issue found, in traversal order
    pub fn collect(graph: &StepGraph, ids: &PredicateIds) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut step_ids: HashSet<&str> = HashSet::new();

        for (idx, step) in graph.steps.iter().enumerate() {
            let location = format!("steps[{idx}]");
            if step.id.is_empty() {
                issues.push(ValidationIssue::error(
                    IssueCode::StepInvalid,
                    location.clone(),
                    "Step id empty",
                ));
            } else if !step_ids.insert(step.id.as_str()) {
                issues.push(ValidationIssue::error(
                    IssueCode::StepInvalid,
                    location.clone(),
                    format!("Duplicate step id {}", step.id),
                ));
            }
            if step.intent.trim().is_empty() {
                issues.push(ValidationIssue::error(
                    IssueCode::StepInvalid,
                    location.clone(),
                    format!("Step {} intent empty", step.id),
                ));
            }

            for (label, refs, known) in [
                ("pre_ref", &step.pre_refs, &ids.pre),
                ("post_ref", &step.post_refs, &ids.post),
                ("invariant_ref", &step.invariant_refs, &ids.invariants),
            ] {
                for reference in refs.iter().filter(|r| !known.contains(*r)) {
                    issues.push(ValidationIssue::error(
                        IssueCode::StepRefUnknown,
                        format!("{location}.{label}s"),
                        format!("Step {} unknown {label} {reference}", step.id),
                    ));
                }
            }
        }

        for (idx, (parent, child)) in graph.edges.iter().enumerate() {
            if !step_ids.contains(parent.as_str()) {
                issues.push(ValidationIssue::error(
                    IssueCode::EdgeInvalid,
                    format!("edges[{idx}]"),
                    format!("Edge parent {parent} not a step id"),
                ));
            }
            if !step_ids.contains(child.as_str()) {
                issues.push(ValidationIssue::error(
                    IssueCode::EdgeInvalid,
                    format!("edges[{idx}]"),
                    format!("Edge child {child} not a step id"),
                ));
            }
        }

        if !graph.order.is_empty() {
            let ordered: HashSet<&str> = graph.order.iter().map(String::as_str).collect();
            if graph.order.len() != step_ids.len() || ordered != step_ids {
                issues.push(ValidationIssue::error(
                    IssueCode::OrderInvalid,
                    "order",
                    "Order does not cover exactly all step ids",
                ));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Step;

    fn ids() -> PredicateIds {
        PredicateIds {
            pre: ["P1".to_string()].into(),
            post: ["Q1".to_string()].into(),
            invariants: HashSet::new(),
        }
    }

    fn graph() -> StepGraph {
        let mut s1 = Step::new("S1", "check input");
        s1.pre_refs = vec!["P1".to_string()];
        s1.children = vec!["S2".to_string()];
        let mut s2 = Step::new("S2", "count distinct values");
        s2.post_refs = vec!["Q1".to_string()];
        s2.parents = vec!["S1".to_string()];
        StepGraph {
            steps: vec![s1, s2],
            edges: vec![("S1".to_string(), "S2".to_string())],
            order: vec!["S1".to_string(), "S2".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_graph() {
        assert!(StepGraphValidator::validate(&graph(), &ids()).is_ok());
    }

    #[test]
    fn test_unknown_post_ref_is_named() {
        let mut g = graph();
        g.steps[1].post_refs = vec!["Q2".to_string()];
        let err = StepGraphValidator::validate(&g, &ids()).unwrap_err();
        assert_eq!(err.to_string(), "Step S2 unknown post_ref Q2");
        assert_eq!(err.issues[0].code, IssueCode::StepRefUnknown);
    }

    #[test]
    fn test_refs_checked_against_their_own_group() {
        let mut g = graph();
        g.steps[0].invariant_refs = vec!["P1".to_string()];
        let err = StepGraphValidator::validate(&g, &ids()).unwrap_err();
        assert_eq!(err.to_string(), "Step S1 unknown invariant_ref P1");
    }

    #[test]
    fn test_step_and_edge_problems_are_all_reported() {
        let mut g = graph();
        g.steps.push(Step::new("S1", " "));
        g.edges.push(("S3".to_string(), "S9".to_string()));
        g.order.clear();
        let err = StepGraphValidator::validate(&g, &ids()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Duplicate step id S1; Step S1 intent empty; \
             Edge parent S3 not a step id; Edge child S9 not a step id"
        );
    }

    #[test]
    fn test_order_must_match_step_ids() {
        let mut g = graph();
        g.order = vec!["S1".to_string()];
        assert!(StepGraphValidator::validate(&g, &ids()).is_err());

        g.order = vec!["S1".to_string(), "S2".to_string(), "S1".to_string()];
        let err = StepGraphValidator::validate(&g, &ids()).unwrap_err();
        assert_eq!(err.issues[0].code, IssueCode::OrderInvalid);

        g.order = vec!["S1".to_string(), "S3".to_string()];
        assert!(StepGraphValidator::validate(&g, &ids()).is_err());
    }

    #[test]
    fn test_empty_order_is_accepted() {
        let mut g = graph();
        g.order.clear();
        assert!(StepGraphValidator::validate(&g, &ids()).is_ok());
    }
}
