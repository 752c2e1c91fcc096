//! Deterministic logic outline derived from a step graph.

use std::fmt;

use crate::domain::models::{Specification, StepGraph};

/// Comment outline that anchors each implementation step to the predicates
/// it relies on or discharges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicSkeleton {
    lines: Vec<String>,
}

impl LogicSkeleton {
    /// First-line marker, followed by the step order
    pub const HEADER_PREFIX: &'static str = "# STEP_GRAPH:";

    /// Build the outline for `graph`, walking `graph.order`
    pub fn from_step_graph(spec: &Specification, graph: &StepGraph) -> Self {
        let steps = graph.ordered_steps();
        let chain = steps
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(" -> ");

        let mut lines = vec![
            format!("{} {chain}", Self::HEADER_PREFIX),
            format!("{}:", spec.signature_line()),
        ];
        for step in steps {
            lines.push(format!("# [{}] {}", step.id, step.intent.trim()));
            lines.push(format!(
                "#   pre: {} | post: {} | inv: {}",
                resolve(spec, &step.pre_refs),
                resolve(spec, &step.post_refs),
                resolve(spec, &step.invariant_refs),
            ));
            if !step.evidence_hooks.is_empty() {
                lines.push(format!("#   evidence: {}", step.evidence_hooks.join(", ")));
            }
        }
        Self { lines }
    }

    /// Anchor ids in the order they appear.
    pub fn anchors(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| l.strip_prefix("# ["))
            .filter_map(|rest| rest.split_once(']').map(|(id, _)| id))
            .collect()
    }

    /// Render as Python comments plus the signature line
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for LogicSkeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn resolve(spec: &Specification, refs: &[String]) -> String {
    if refs.is_empty() {
        return "-".to_string();
    }
    refs.iter()
        .map(|id| match spec.find_predicate(id) {
            Some(p) => format!("{id}({})", p.expr),
            None => id.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{FunctionSpec, Parameter, Predicate, Signature, Step};

    fn fixture() -> (Specification, StepGraph) {
        let spec = Specification {
            main_function: Some(FunctionSpec {
                name: "count_unique".to_string(),
                signature: Signature {
                    parameters: vec![Parameter {
                        name: "nums".to_string(),
                        ..Default::default()
                    }],
                    return_type: "int".to_string(),
                    return_description: String::new(),
                },
                ..Default::default()
            }),
            pre: vec![Predicate::new("P1", "nums is not None")],
            post: vec![Predicate::new("Q1", "result >= 0")],
            ..Default::default()
        };
        let mut s1 = Step::new("S1", "reject missing input");
        s1.pre_refs = vec!["P1".to_string()];
        let mut s2 = Step::new("S2", "count with a set");
        s2.post_refs = vec!["Q1".to_string()];
        s2.evidence_hooks = vec!["len(set(nums))".to_string()];
        let graph = StepGraph {
            steps: vec![s1, s2],
            edges: vec![("S1".to_string(), "S2".to_string())],
            order: vec!["S2".to_string(), "S1".to_string()],
            ..Default::default()
        };
        (spec, graph)
    }

    #[test]
    fn test_skeleton_follows_order() {
        let (spec, graph) = fixture();
        let skeleton = LogicSkeleton::from_step_graph(&spec, &graph);
        assert_eq!(
            skeleton.render(),
            "# STEP_GRAPH: S2 -> S1\n\
             def count_unique(nums) -> int:\n\
             # [S2] count with a set\n\
             #   pre: - | post: Q1(result >= 0) | inv: -\n\
             #   evidence: len(set(nums))\n\
             # [S1] reject missing input\n\
             #   pre: P1(nums is not None) | post: - | inv: -"
        );
        assert_eq!(skeleton.anchors(), vec!["S2", "S1"]);
    }
}
