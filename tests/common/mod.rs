//! Common test utilities for integration tests
//!
//! Shared fixtures: a small specification, a scriptable executor and
//! logging setup.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use specforge::domain::models::ExecutionResult;
use specforge::domain::ports::{CodeExecutor, ExecutorError};

/// `count_unique(nums)` with one positive and one negative example.
pub const COUNT_UNIQUE_SPEC: &str = r#"{
    "spec_version": 2,
    "main_function": {
        "name": "count_unique",
        "purpose": "Count distinct values in a list",
        "signature": {"return_type": "int"}
    },
    "types": {"parameters": [{"name": "nums", "type": "list[int]"}]},
    "pre": [{"id": "P1", "expr": "nums is not None"}],
    "post": [{"id": "Q1", "expr": "result >= 0 and result <= len(nums)"}],
    "examples": {
        "positive": [
            {"id": "E1", "inputs": {"nums": [1, 1, 2]}, "output": 2},
            {"id": "E2", "inputs": {"nums": []}, "output": 0}
        ],
        "negative": [
            {"id": "N1", "inputs": {"nums": null}, "raises": "TypeError"}
        ]
    }
}"#;

pub const COUNT_UNIQUE_GRAPH: &str = r#"{
    "steps": [
        {"id": "S1", "intent": "reject missing input", "pre_refs": ["P1"]},
        {"id": "S2", "intent": "collect values into a set", "post_refs": ["Q1"]}
    ],
    "edges": [["S1", "S2"]]
}"#;

pub const CORRECT_CODE: &str = "def count_unique(nums):\n    return len(set(nums))";

type Behaviour = dyn Fn(&str, &Value) -> ExecutionResult + Send + Sync;

/// Executor that answers from a closure over the candidate code and the
/// bound example inputs instead of running Python.
pub struct FnExecutor {
    behaviour: Box<Behaviour>,
    calls: AtomicUsize,
}

impl FnExecutor {
    pub fn new(behaviour: impl Fn(&str, &Value) -> ExecutionResult + Send + Sync + 'static) -> Self {
        Self {
            behaviour: Box::new(behaviour),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeExecutor for FnExecutor {
    async fn run(
        &self,
        code: &str,
        globals: &HashMap<String, Value>,
    ) -> Result<ExecutionResult, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let inputs = globals.get("specforge_inputs").cloned().unwrap_or(Value::Null);
        Ok((self.behaviour)(code, &inputs))
    }
}

/// Behaves like `len(set(nums))`, raising TypeError on `None`.
/// Code without `set(` is treated as the buggy `len(nums)`.
pub fn count_unique_executor() -> FnExecutor {
    FnExecutor::new(|code, inputs| {
        let Some(nums) = inputs["nums"].as_array() else {
            return ExecutionResult::success(
                "ERROR: object of type 'NoneType' has no len()\nERROR_TYPE: TypeError",
            );
        };
        let answer = if code.contains("set(") {
            let mut distinct: Vec<&Value> = Vec::new();
            for n in nums {
                if !distinct.contains(&n) {
                    distinct.push(n);
                }
            }
            distinct.len()
        } else {
            nums.len()
        };
        ExecutionResult::success(format!("RESULT: {answer}"))
    })
}

pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
