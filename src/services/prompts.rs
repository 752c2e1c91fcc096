//! Prompt templates for every oracle call the pipeline makes.

use crate::domain::models::{PredicateIds, Specification, ValidationReport};
use crate::services::logic_skeleton::LogicSkeleton;

/// System prompt for drafting a specification
pub const SPECIFICATION_SYSTEM: &str = "\
You are a software architect who writes precise function contracts. \
Respond with a single JSON object and nothing else.";

/// System prompt for planning a step graph
pub const STEP_GRAPH_SYSTEM: &str = "\
You are a software architect who plans implementations as small, verifiable steps. \
Respond with a single JSON object and nothing else.";

/// System prompt for free-form logic
pub const LOGIC_SYSTEM: &str = "\
You are a senior engineer. Describe the algorithm for a function as numbered, \
language-neutral steps. Do not write code.";

/// System prompt for writing code
pub const IMPLEMENTATION_SYSTEM: &str = "\
You are a senior Python engineer. Write a complete, self-contained implementation \
that uses only the standard library. Respond with JSON: {\"code\": \"...\", \"explanation\": \"...\"}.";

/// System prompt for fixing failing code
pub const REFINE_SYSTEM: &str = "\
You are an expert code reviewer and debugger. Fix the implementation so every test passes. \
Keep every line purposeful. Respond with JSON: {\"code\": \"...\", \"explanation\": \"...\"}.";

const SPECIFICATION_SHAPE: &str = r#"{
  "spec_version": 2,
  "main_function": {
    "name": "snake_case_name",
    "purpose": "one sentence",
    "signature": {
      "parameters": [{"name": "x", "type": "int", "description": "", "constraints": ""}],
      "return_type": "int",
      "return_description": ""
    },
    "exceptions": [{"type": "ValueError", "condition": "x < 0"}]
  },
  "helper_functions": [],
  "types": {
    "parameters": [{"name": "x", "type": "int", "description": "", "nullable": false, "union": []}],
    "return": {"name": "result", "type": "int"},
    "exceptions": [{"type": "ValueError", "predicate": "x < 0", "message": ""}]
  },
  "pre": [{"id": "P1", "expr": "x >= 0", "message": ""}],
  "post": [{"id": "Q1", "expr": "result >= 0", "message": ""}],
  "invariants": [],
  "examples": {
    "positive": [{"id": "E1", "inputs": {"x": 2}, "output": 4, "tags": [], "notes": ""}],
    "negative": [{"id": "N1", "inputs": {"x": -1}, "raises": "ValueError", "tags": [], "notes": ""}]
  },
  "metamorphic_relations": [],
  "forbidden_apis": [],
  "complexity_guarantee": {"big_o": "O(1)", "witness_rules": []},
  "oracle": null,
  "design_notes": ""
}"#;

const STEP_GRAPH_SHAPE: &str = r#"{
  "version": 1,
  "steps": [
    {"id": "S1", "intent": "what this step does", "pre_refs": [], "post_refs": [],
     "invariant_refs": [], "evidence_hooks": [], "parents": [], "children": ["S2"]}
  ],
  "edges": [["S1", "S2"]],
  "order": ["S1", "S2"]
}"#;

/// Ask for a specification of `requirement`
pub fn specification_prompt(requirement: &str) -> String {
    format!(
        "Write a function contract for this requirement:\n\n{requirement}\n\n\
         Return JSON with exactly this shape:\n{SPECIFICATION_SHAPE}\n\n\
         Rules:\n\
         - `pre` and `post` each need at least one predicate.\n\
         - Predicates are single Python boolean expressions over the parameter names and `result`. \
           The only callable builtins are len, abs, min, max, sum, all and any.\n\
         - Predicate ids are unique across pre, post and invariants. Example ids are unique across both groups.\n\
         - Positive examples set `output` and never `raises`. Negative examples set `raises` and never `output`.\n\
         - `relation` is one of equal, subset, permutation, length_non_decreasing, custom; custom needs `oracle_expr`.\n\
         - `big_o` looks like O(n). Witness rules come from no_sort, no_quadratic_nested_loops, no_hash_map, no_recursion."
    )
}

fn sorted_ids(ids: &std::collections::HashSet<String>) -> String {
    let mut ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    if ids.is_empty() {
        "(none)".to_string()
    } else {
        ids.join(", ")
    }
}

/// Ask for a step graph that references only `ids`
pub fn step_graph_prompt(spec_json: &str, ids: &PredicateIds) -> String {
    format!(
        "Plan the implementation of this contract as a graph of steps:\n\n{spec_json}\n\n\
         Return JSON with exactly this shape:\n{STEP_GRAPH_SHAPE}\n\n\
         Rules:\n\
         - Step ids are unique and every step has a non-empty intent.\n\
         - pre_refs may only use: {pre}\n\
         - post_refs may only use: {post}\n\
         - invariant_refs may only use: {inv}\n\
         - Every edge connects two declared steps.\n\
         - `order` lists every step id exactly once.",
        pre = sorted_ids(&ids.pre),
        post = sorted_ids(&ids.post),
        inv = sorted_ids(&ids.invariants),
    )
}

fn parameter_docs(spec: &Specification) -> String {
    let Some(main) = &spec.main_function else {
        return String::new();
    };
    main.signature
        .parameters
        .iter()
        .map(|p| {
            let mut line = format!("- {} ({}): {}", p.name, p.type_name, p.description);
            if !p.constraints.is_empty() {
                line.push_str(&format!(". Constraints: {}", p.constraints));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn exception_docs(spec: &Specification) -> String {
    spec.types
        .exceptions
        .iter()
        .map(|e| format!("- {} when {}", e.exception_type, e.predicate))
        .chain(spec.main_function.iter().flat_map(|f| {
            f.exceptions
                .iter()
                .map(|e| format!("- {} when {}", e.exception_type, e.condition))
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask for numbered implementation logic
pub fn logic_prompt(spec: &Specification, spec_json: &str) -> String {
    format!(
        "Contract:\n{spec_json}\n\n\
         Function: {signature}\n\
         Purpose: {purpose}\n\
         Parameters:\n{params}\n\
         Exceptions:\n{exceptions}\n\n\
         Describe the algorithm step by step.",
        signature = spec.signature_line(),
        purpose = spec.purpose(),
        params = parameter_docs(spec),
        exceptions = exception_docs(spec),
    )
}

/// Ask for code following `logic`
pub fn implementation_prompt(spec: &Specification, spec_json: &str, logic: &str) -> String {
    let skeleton_note = if logic.starts_with(LogicSkeleton::HEADER_PREFIX) {
        "Follow the step graph below; keep each `# [Sx]` anchor comment above the code that implements it."
    } else {
        "Follow the logic below."
    };
    format!(
        "Implement `{signature}` in Python.\n\n\
         Contract:\n{spec_json}\n\n\
         {skeleton_note}\n\n{logic}\n\n\
         Raise the declared exception types for invalid inputs. \
         Do not use: {forbidden}.",
        signature = spec.signature_line(),
        forbidden = if spec.forbidden_apis.is_empty() {
            "eval, exec, file or network access".to_string()
        } else {
            spec.forbidden_apis.join(", ")
        },
    )
}

/// Ask for a fix, listing every failing example
pub fn refine_prompt(spec: &Specification, code: &str, report: &ValidationReport) -> String {
    let failing = report
        .failing()
        .map(|t| {
            let expected = t.expected_exception.as_ref().map_or_else(
                || t.expected_output.as_ref().map_or_else(|| "null".to_string(), ToString::to_string),
                |exc| format!("raises {exc}"),
            );
            format!(
                "Test: {}\nInput: {}\nExpected: {}\nActual: {}\nError: {}",
                t.test_name,
                t.input_values,
                expected,
                t.actual_output
                    .as_ref()
                    .map_or_else(|| "N/A".to_string(), ToString::to_string),
                t.error.as_deref().unwrap_or("none"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let suggestions = report
        .suggestions
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Fix the following implementation.\n\n\
         Function: {name}\n\
         Purpose: {purpose}\n\n\
         Current implementation:\n```python\n{code}\n```\n\n\
         Passed {passed}/{total} tests.\n\n\
         Failing tests:\n{failing}\n\n\
         Suggestions:\n{suggestions}\n\n\
         Requirements:\n\
         1. Find the cause of every failure.\n\
         2. Fix all failing tests without breaking passing ones.\n\
         3. Keep the function signature unchanged.\n\
         4. Remove redundant or unused lines.",
        name = spec.name(),
        purpose = spec.purpose(),
        passed = report.passed_count,
        total = report.total_tests,
    )
}
