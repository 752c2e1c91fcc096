//! Runs candidate code against a specification's examples.
//!
//! Each example is one executor call: the candidate code followed by a
//! trailer that calls the target function with the example inputs bound as
//! keyword arguments and prints a tagged result line.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::domain::models::{
    Example, ExampleKind, ExecutionStatus, Specification, TestResult, ValidationReport,
};
use crate::domain::ports::CodeExecutor;

/// Global holding the example inputs inside the executed snippet.
pub const INPUTS_GLOBAL: &str = "specforge_inputs";

const RESULT_TAG: &str = "RESULT:";
const ERROR_TAG: &str = "ERROR:";
const ERROR_TYPE_TAG: &str = "ERROR_TYPE:";

const FLOAT_TOLERANCE: f64 = 1e-9;

/// Why a test failed, used to derive suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FailureKind {
    OutputMismatch,
    RuntimeError,
    ExceptionMismatch,
    ExecutionFailed,
}

/// Runs examples against candidate code in a sandboxed executor.
pub struct TestHarness {
    executor: Arc<dyn CodeExecutor>,
}

impl TestHarness {
    /// Harness backed by `executor`
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self { executor }
    }

    /// Run every example, positive group first, and build the report.
    pub async fn validate(&self, code: &str, spec: &Specification) -> ValidationReport {
        if spec.examples.is_empty() {
            return ValidationReport::from_results(
                Vec::new(),
                vec!["The specification has no examples; correctness cannot be verified".to_string()],
            );
        }

        let snippet = build_snippet(code, spec.name());
        let mut results = Vec::with_capacity(spec.examples.len());
        let mut failures = BTreeSet::new();

        for (idx, (kind, example)) in spec.examples.iter().enumerate() {
            let test_name = format!("Example_{}", idx + 1);
            let (result, failure) = self.run_example(&snippet, test_name, kind, example).await;
            tracing::debug!(test = %result.test_name, passed = result.passed, "Example executed");
            if let Some(failure) = failure {
                failures.insert(failure);
            }
            results.push(result);
        }

        let suggestions = suggestions(&failures, spec);
        ValidationReport::from_results(results, suggestions)
    }

    async fn run_example(
        &self,
        snippet: &str,
        test_name: String,
        kind: ExampleKind,
        example: &Example,
    ) -> (TestResult, Option<FailureKind>) {
        let mut result = TestResult {
            test_name,
            passed: false,
            input_values: example.inputs.clone(),
            expected_output: example.output.clone(),
            expected_exception: example.expected_exception().map(str::to_string),
            actual_output: None,
            error: None,
        };

        let globals = HashMap::from([(INPUTS_GLOBAL.to_string(), example.inputs.clone())]);
        let execution = match self.executor.run(snippet, &globals).await {
            Ok(execution) => execution,
            Err(err) => {
                result.error = Some(format!("Executor failure: {err}"));
                return (result, Some(FailureKind::ExecutionFailed));
            }
        };

        if execution.status != ExecutionStatus::Success {
            result.error = Some(
                execution
                    .error
                    .clone()
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| match execution.status {
                        ExecutionStatus::Timeout => "Execution timed out".to_string(),
                        ExecutionStatus::SecurityError => "Rejected by security check".to_string(),
                        _ => "Code execution failed".to_string(),
                    }),
            );
            return (result, Some(FailureKind::ExecutionFailed));
        }

        let failure = match parse_output(&execution.stdout) {
            Outcome::Returned(Ok(actual)) => {
                let failure = match kind {
                    ExampleKind::Positive => {
                        let expected = example.output.clone().unwrap_or(Value::Null);
                        if values_equal(&expected, &actual) {
                            None
                        } else {
                            result.error = Some(format!("expected {expected}, got {actual}"));
                            Some(FailureKind::OutputMismatch)
                        }
                    }
                    ExampleKind::Negative => {
                        result.error = Some(format!(
                            "expected {} to be raised",
                            example.expected_exception().unwrap_or("an exception")
                        ));
                        Some(FailureKind::ExceptionMismatch)
                    }
                };
                result.actual_output = Some(actual);
                failure
            }
            Outcome::Returned(Err(raw)) => {
                result.error = Some(format!("Could not parse function output: {raw}"));
                Some(FailureKind::OutputMismatch)
            }
            Outcome::Raised { message, type_name } => match kind {
                ExampleKind::Negative
                    if example
                        .expected_exception()
                        .is_some_and(|want| unqualified(want) == unqualified(&type_name)) =>
                {
                    None
                }
                ExampleKind::Negative => {
                    result.error = Some(format!(
                        "expected {} to be raised, got {type_name}: {message}",
                        example.expected_exception().unwrap_or("an exception")
                    ));
                    Some(FailureKind::ExceptionMismatch)
                }
                ExampleKind::Positive => {
                    result.error = Some(format!("Runtime error: {type_name}: {message}"));
                    Some(FailureKind::RuntimeError)
                }
            },
            Outcome::Missing => {
                result.error = Some("Could not find a result line in the output".to_string());
                Some(FailureKind::ExecutionFailed)
            }
        };

        result.passed = failure.is_none();
        (result, failure)
    }
}

/// Candidate code plus the calling trailer.
pub fn build_snippet(code: &str, function_name: &str) -> String {
    format!(
        "{code}\n\n\
         import json as _specforge_json\n\
         try:\n    \
             _specforge_result = {function_name}(**{INPUTS_GLOBAL})\n    \
             print(\"{RESULT_TAG} \" + _specforge_json.dumps(_specforge_result, default=repr))\n\
         except Exception as _specforge_exc:\n    \
             print(\"{ERROR_TAG} \" + str(_specforge_exc).replace(\"\\n\", \" \"))\n    \
             print(\"{ERROR_TYPE_TAG} \" + type(_specforge_exc).__name__)\n"
    )
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Returned(Result<Value, String>),
    Raised { message: String, type_name: String },
    Missing,
}

/// Read the tagged lines. The last tag wins so output printed by the
/// candidate itself cannot shadow the trailer.
fn parse_output(stdout: &str) -> Outcome {
    let mut outcome = Outcome::Missing;
    let mut pending_error: Option<String> = None;

    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix(RESULT_TAG) {
            let raw = rest.trim();
            pending_error = None;
            outcome = Outcome::Returned(serde_json::from_str(raw).map_err(|_| raw.to_string()));
        } else if let Some(rest) = line.strip_prefix(ERROR_TYPE_TAG) {
            outcome = Outcome::Raised {
                message: pending_error.take().unwrap_or_default(),
                type_name: rest.trim().to_string(),
            };
        } else if let Some(rest) = line.strip_prefix(ERROR_TAG) {
            pending_error = Some(rest.trim().to_string());
        }
    }
    if let Some(message) = pending_error {
        return Outcome::Raised {
            message,
            type_name: "Exception".to_string(),
        };
    }
    outcome
}

fn unqualified(type_name: &str) -> &str {
    let trimmed = type_name.trim();
    trimmed.rsplit('.').next().unwrap_or(trimmed)
}

fn integer_value(n: &serde_json::Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// JSON equality where numbers compare by value, so `2 == 2.0`.
///
/// Integers on both sides compare exactly; the float tolerance only applies
/// when at least one side is a float.
pub fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (integer_value(a), integer_value(b)) {
                return x == y;
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => {
                    let scale = x.abs().max(y.abs()).max(1.0);
                    (x - y).abs() <= FLOAT_TOLERANCE * scale
                }
                _ => a == b,
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => expected == actual,
    }
}

fn suggestions(failures: &BTreeSet<FailureKind>, spec: &Specification) -> Vec<String> {
    if failures.is_empty() {
        return vec!["All tests passed".to_string()];
    }
    failures
        .iter()
        .map(|failure| match failure {
            FailureKind::OutputMismatch => {
                "Check the function logic so return values match the expected outputs".to_string()
            }
            FailureKind::RuntimeError => {
                "Handle runtime exceptions and check boundary cases".to_string()
            }
            FailureKind::ExceptionMismatch => {
                let declared: BTreeSet<&str> = spec
                    .examples
                    .negative
                    .iter()
                    .filter_map(Example::expected_exception)
                    .collect();
                format!(
                    "Raise the declared exception types for invalid inputs: {}",
                    declared.into_iter().collect::<Vec<_>>().join(", ")
                )
            }
            FailureKind::ExecutionFailed => {
                "Make sure the code runs to completion within the time limit using only safe builtins"
                    .to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ExecutionResult;
    use crate::domain::ports::ExecutorError;
    use async_trait::async_trait;
    use serde_json::json;

    /// Answers each call with the next canned stdout.
    struct CannedExecutor {
        outputs: std::sync::Mutex<Vec<ExecutionResult>>,
    }

    impl CannedExecutor {
        fn new(outputs: Vec<ExecutionResult>) -> Arc<Self> {
            Arc::new(Self {
                outputs: std::sync::Mutex::new(outputs.into_iter().rev().collect()),
            })
        }
    }

    #[async_trait]
    impl CodeExecutor for CannedExecutor {
        async fn run(
            &self,
            code: &str,
            globals: &HashMap<String, Value>,
        ) -> Result<ExecutionResult, ExecutorError> {
            assert!(code.contains("**specforge_inputs"));
            assert!(globals.contains_key(INPUTS_GLOBAL));
            self.outputs
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ExecutorError::SpawnFailed("no more outputs".to_string()))
        }
    }

    fn spec() -> Specification {
        let mut spec = Specification::default();
        spec.main_function = Some(crate::domain::models::FunctionSpec {
            name: "f".to_string(),
            ..Default::default()
        });
        spec.examples.positive = vec![
            Example::positive("E1", json!({"nums": [1, 1, 2]}), json!(2)),
            Example::positive("E2", json!({"nums": []}), json!(0)),
        ];
        spec.examples.negative = vec![Example::negative("N1", json!({"nums": null}), "TypeError")];
        spec
    }

    #[test]
    fn test_snippet_calls_with_keyword_inputs() {
        let snippet = build_snippet("def f(nums):\n    return len(nums)", "f");
        assert!(snippet.starts_with("def f(nums):\n    return len(nums)\n\n"));
        assert!(snippet.contains("    _specforge_result = f(**specforge_inputs)\n"));
        assert!(snippet.contains("print(\"ERROR_TYPE: \" + type(_specforge_exc).__name__)"));
    }

    #[test]
    fn test_parse_output_variants() {
        assert_eq!(parse_output("RESULT: [1, 2]\n"), Outcome::Returned(Ok(json!([1, 2]))));
        assert_eq!(
            parse_output("RESULT: <object at 0x1>"),
            Outcome::Returned(Err("<object at 0x1>".to_string()))
        );
        assert_eq!(
            parse_output("debug\nERROR: bad input\nERROR_TYPE: ValueError\n"),
            Outcome::Raised {
                message: "bad input".to_string(),
                type_name: "ValueError".to_string()
            }
        );
        assert_eq!(parse_output("nothing"), Outcome::Missing);
        assert_eq!(
            parse_output("RESULT: 1\nRESULT: 2"),
            Outcome::Returned(Ok(json!(2)))
        );
    }

    #[test]
    fn test_candidate_error_line_before_result_is_ignored() {
        assert_eq!(
            parse_output("ERROR: ignoring bad entry\nRESULT: 2\n"),
            Outcome::Returned(Ok(json!(2)))
        );
        assert_eq!(
            parse_output("ERROR: noise\nERROR: boom\nERROR_TYPE: builtins.ValueError\n"),
            Outcome::Raised {
                message: "boom".to_string(),
                type_name: "builtins.ValueError".to_string()
            }
        );
    }

    #[test]
    fn test_values_equal_numeric_tolerance() {
        assert!(values_equal(&json!(2), &json!(2.0)));
        assert!(values_equal(&json!({"a": [1, 2.0]}), &json!({"a": [1.0, 2]})));
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!values_equal(&json!("2"), &json!(2)));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!values_equal(&json!(10_000_000_000_i64), &json!(10_000_000_005_i64)));
        assert!(!values_equal(&json!(u64::MAX), &json!(u64::MAX - 1)));
        assert!(values_equal(&json!(-7), &json!(-7)));
        assert!(values_equal(&json!(0.1 + 0.2), &json!(0.3)));
    }

    #[tokio::test]
    async fn test_report_in_declared_order() {
        let executor = CannedExecutor::new(vec![
            ExecutionResult::success("RESULT: 2\n"),
            ExecutionResult::success("RESULT: 1\n"),
            ExecutionResult::success("ERROR: object of type 'NoneType' has no len()\nERROR_TYPE: builtins.TypeError\n"),
        ]);
        let report = TestHarness::new(executor).validate("code", &spec()).await;

        let names: Vec<_> = report.test_results.iter().map(|t| t.test_name.as_str()).collect();
        assert_eq!(names, vec!["Example_1", "Example_2", "Example_3"]);
        assert!(report.test_results[0].passed);
        assert_eq!(report.test_results[0].actual_output, Some(json!(2)));
        assert!(!report.test_results[1].passed);
        assert_eq!(report.test_results[1].error.as_deref(), Some("expected 0, got 1"));
        assert!(report.test_results[2].passed);
        assert_eq!(report.passed_count, 2);
        assert_eq!(
            report.suggestions,
            vec!["Check the function logic so return values match the expected outputs"]
        );
    }

    #[tokio::test]
    async fn test_negative_example_that_returns_fails() {
        let executor = CannedExecutor::new(vec![
            ExecutionResult::success("RESULT: 2"),
            ExecutionResult::success("RESULT: 0"),
            ExecutionResult::success("RESULT: 0"),
        ]);
        let report = TestHarness::new(executor).validate("code", &spec()).await;
        let negative = &report.test_results[2];
        assert!(!negative.passed);
        assert_eq!(negative.error.as_deref(), Some("expected TypeError to be raised"));
        assert_eq!(negative.expected_exception.as_deref(), Some("TypeError"));
        assert!(report.suggestions[0].contains("TypeError"));
    }

    #[tokio::test]
    async fn test_execution_failures_are_test_failures() {
        let mut timeout = ExecutionResult::failure("");
        timeout.status = ExecutionStatus::Timeout;
        let executor = CannedExecutor::new(vec![
            timeout,
            ExecutionResult::success("ERROR: boom\nERROR_TYPE: ZeroDivisionError"),
        ]);
        let report = TestHarness::new(executor).validate("code", &spec()).await;
        assert_eq!(report.test_results[0].error.as_deref(), Some("Execution timed out"));
        assert_eq!(
            report.test_results[1].error.as_deref(),
            Some("Runtime error: ZeroDivisionError: boom")
        );
        assert!(report.test_results[2]
            .error
            .as_deref()
            .unwrap()
            .starts_with("Executor failure"));
        assert_eq!(report.passed_count, 0);
    }

    #[tokio::test]
    async fn test_no_examples_is_vacuously_valid() {
        let executor = CannedExecutor::new(Vec::new());
        let report = TestHarness::new(executor)
            .validate("code", &Specification::default())
            .await;
        assert!(report.is_valid);
        assert_eq!(report.total_tests, 0);
        assert_eq!(report.suggestions.len(), 1);
    }
}
