//! Execution and test-report models used by the validate/refine loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Outcome class of a single executor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Ran to completion with exit status zero
    Success,
    /// Raised, exited non-zero, or could not be run
    Failure,
    /// Killed after exceeding the time limit
    Timeout,
    /// Rejected by the static check before running
    SecurityError,
}

/// What the executor observed for one snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcome class
    pub status: ExecutionStatus,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Failure detail, if any
    pub error: Option<String>,
    /// Wall-clock time of the run
    #[serde(with = "duration_secs")]
    pub execution_time: Duration,
}

impl ExecutionResult {
    /// A successful run that printed `stdout`
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Success,
            stdout: stdout.into(),
            stderr: String::new(),
            error: None,
            execution_time: Duration::ZERO,
        }
    }

    /// A failed run with no output
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failure,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error.into()),
            execution_time: Duration::ZERO,
        }
    }

    /// Attach the measured run time
    #[must_use]
    pub fn with_time(mut self, elapsed: Duration) -> Self {
        self.execution_time = elapsed;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Seconds as a float
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    /// Seconds as a float; negatives clamp to zero
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// Result of running one example against the candidate code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Example id
    pub test_name: String,
    /// Whether the example was satisfied
    pub passed: bool,
    /// Inputs the function was called with
    pub input_values: Value,
    /// Return value a positive example expects
    pub expected_output: Option<Value>,
    /// Exception type expected by a negative example
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_exception: Option<String>,
    /// Value the candidate returned, when it returned one
    pub actual_output: Option<Value>,
    /// Why the example failed
    pub error: Option<String>,
}

/// Aggregated pass/fail report for one validation round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Every example passed
    pub is_valid: bool,
    /// Number of examples run
    pub total_tests: usize,
    /// Number of examples passed
    pub passed_count: usize,
    /// Per-example results in declaration order
    pub test_results: Vec<TestResult>,
    /// Hints for the next refinement, derived from the failures
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    /// Summarize per-example results
    pub fn from_results(test_results: Vec<TestResult>, suggestions: Vec<String>) -> Self {
        let total_tests = test_results.len();
        let passed_count = test_results.iter().filter(|t| t.passed).count();
        Self {
            is_valid: passed_count == total_tests,
            total_tests,
            passed_count,
            test_results,
            suggestions,
        }
    }

    /// Results that did not pass
    pub fn failing(&self) -> impl Iterator<Item = &TestResult> {
        self.test_results.iter().filter(|t| !t.passed)
    }

    /// Pass ratio in `[0, 1]`; an empty report counts as fully passing.
    #[allow(clippy::cast_precision_loss)]
    pub fn pass_rate(&self) -> f64 {
        if self.total_tests == 0 {
            1.0
        } else {
            self.passed_count as f64 / self.total_tests as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(name: &str, passed: bool) -> TestResult {
        TestResult {
            test_name: name.to_string(),
            passed,
            input_values: json!({}),
            expected_output: Some(json!(1)),
            expected_exception: None,
            actual_output: None,
            error: None,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = ValidationReport::from_results(
            vec![result("Example_1", true), result("Example_2", false)],
            vec![],
        );
        assert!(!report.is_valid);
        assert_eq!(report.total_tests, 2);
        assert_eq!(report.passed_count, 1);
        assert_eq!(report.failing().count(), 1);
        assert!((report.pass_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_execution_time_serializes_as_seconds() {
        let res = ExecutionResult::success("RESULT: 2").with_time(Duration::from_millis(1500));
        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["execution_time"], json!(1.5));
        assert_eq!(value["status"], json!("SUCCESS"));
    }
}
