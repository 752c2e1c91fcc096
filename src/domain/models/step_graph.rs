//! Step-graph domain models
//!
//! A DAG of implementation steps. Each step names the specification
//! predicates it relies on or discharges; `order` is the linearization used
//! to lay out the logic skeleton.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::domain::errors::DomainResult;

fn default_version() -> i64 {
    1
}

/// One node of the step graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Unique step id, e.g. `S1`
    #[serde(default)]
    pub id: String,
    /// What the step does, in free text
    #[serde(default)]
    pub intent: String,
    /// Precondition ids the step relies on
    #[serde(default)]
    pub pre_refs: Vec<String>,
    /// Postcondition ids the step establishes
    #[serde(default)]
    pub post_refs: Vec<String>,
    /// Invariant ids the step maintains
    #[serde(default)]
    pub invariant_refs: Vec<String>,
    /// Checks that show the step did its job
    #[serde(default)]
    pub evidence_hooks: Vec<String>,
    /// Step ids this step depends on
    #[serde(default)]
    pub parents: Vec<String>,
    /// Step ids depending on this step
    #[serde(default)]
    pub children: Vec<String>,
}

impl Step {
    /// A step with no references
    pub fn new(id: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            intent: intent.into(),
            ..Default::default()
        }
    }
}

/// The planning artifact derived from a specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepGraph {
    /// Format version, defaults to 1
    #[serde(default = "default_version")]
    pub version: i64,
    /// Steps in declaration order
    #[serde(default)]
    pub steps: Vec<Step>,
    /// `(parent_id, child_id)` pairs, serialized as two-element arrays
    #[serde(default)]
    pub edges: Vec<(String, String)>,
    /// Linearization of the step ids; empty means declaration order
    #[serde(default)]
    pub order: Vec<String>,
}

impl Default for StepGraph {
    fn default() -> Self {
        Self {
            version: default_version(),
            steps: Vec::new(),
            edges: Vec::new(),
            order: Vec::new(),
        }
    }
}

impl StepGraph {
    /// Deserialize from a JSON value
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Parse from JSON text
    pub fn from_json(raw: &str) -> DomainResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize as indented JSON
    pub fn to_json_pretty(&self) -> DomainResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Step ids in declaration order
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    /// Look up a step by id
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Fill an empty `order` with the steps' declaration order.
    ///
    /// Returns `true` when the order was filled in.
    pub fn default_order_if_empty(&mut self) -> bool {
        if !self.order.is_empty() {
            return false;
        }
        self.order = self.steps.iter().map(|s| s.id.clone()).collect();
        true
    }

    /// Ids that appear more than once in `order`, in first-repeat order.
    pub fn duplicate_order_entries(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut dups = Vec::new();
        for id in &self.order {
            if !seen.insert(id.as_str()) && reported.insert(id.as_str()) {
                dups.push(id.clone());
            }
        }
        dups
    }

    /// Steps in `order`, skipping ids that do not resolve.
    pub fn ordered_steps(&self) -> Vec<&Step> {
        self.order.iter().filter_map(|id| self.step(id)).collect()
    }
}
