//! Validate/refine loop
//!
//! VALIDATING runs every example against the current code. On a full pass
//! the loop ends; otherwise REFINING asks the oracle for a patched version
//! and validation starts over from scratch. A failed refinement request ends
//! the loop immediately.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::models::{Specification, ValidationReport};
use crate::domain::ports::{GenerationParameters, LlmOracle, OracleError, OracleRequest};
use crate::services::prompts::{refine_prompt, REFINE_SYSTEM};
use crate::services::response_parsing::{extract_code, ExtractedCode};
use crate::services::test_harness::TestHarness;

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Termination {
    /// Every example passes
    Passed,
    /// Refinement budget used up with failures left
    BudgetExhausted,
    /// The oracle call or code extraction failed
    RefinementFailed(String),
}

/// Result of a validate/refine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineOutcome {
    /// Whether the final report passes
    pub success: bool,
    /// Best code seen: most tests passed, later versions winning ties
    pub code: String,
    /// Explanation accompanying `code`
    pub explanation: String,
    /// Report for `code`
    pub validation_report: ValidationReport,
    /// Refinements applied
    pub attempts_used: u32,
    /// Validation rounds run
    pub validations: u32,
    /// Why the loop stopped
    pub termination: Termination,
}

struct Candidate {
    code: String,
    explanation: String,
    report: ValidationReport,
}

/// Validates code against the examples and asks the oracle to fix failures.
pub struct RefineLoop {
    oracle: Arc<dyn LlmOracle>,
    harness: TestHarness,
    parameters: GenerationParameters,
}

impl RefineLoop {
    /// Loop with default generation parameters
    pub fn new(oracle: Arc<dyn LlmOracle>, harness: TestHarness) -> Self {
        Self {
            oracle,
            harness,
            parameters: GenerationParameters::default(),
        }
    }

    /// Override generation parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Validate `code`, refining up to `max_refine_attempts` times
    pub async fn run(
        &self,
        code: &str,
        explanation: &str,
        spec: &Specification,
        max_refine_attempts: u32,
    ) -> RefineOutcome {
        let mut code = code.to_string();
        let mut explanation = explanation.to_string();
        let mut attempts_used = 0;
        let mut validations = 0;
        let mut best: Option<Candidate> = None;

        loop {
            let report = self.harness.validate(&code, spec).await;
            validations += 1;
            tracing::info!(
                function = spec.name(),
                attempt = attempts_used,
                passed = report.passed_count,
                total = report.total_tests,
                "Validation round finished"
            );

            let improved = best
                .as_ref()
                .is_none_or(|b| report.passed_count >= b.report.passed_count);
            if improved {
                best = Some(Candidate {
                    code: code.clone(),
                    explanation: explanation.clone(),
                    report: report.clone(),
                });
            }

            let termination = if report.is_valid {
                Termination::Passed
            } else if attempts_used >= max_refine_attempts {
                tracing::warn!(
                    attempts = attempts_used,
                    passed = report.passed_count,
                    total = report.total_tests,
                    "Refine budget exhausted"
                );
                Termination::BudgetExhausted
            } else {
                tracing::warn!(
                    attempt = attempts_used + 1,
                    max_refine_attempts,
                    failing = report.total_tests - report.passed_count,
                    "Validation failed; requesting refinement"
                );
                match self.refine(spec, &code, &report).await {
                    Ok(refined) => {
                        code = refined.code;
                        if !refined.explanation.is_empty() {
                            explanation = refined.explanation;
                        }
                        attempts_used += 1;
                        continue;
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Refinement request failed; stopping");
                        Termination::RefinementFailed(err.to_string())
                    }
                }
            };

            let best = best.unwrap_or(Candidate {
                code,
                explanation,
                report,
            });
            return RefineOutcome {
                success: termination == Termination::Passed,
                code: best.code,
                explanation: best.explanation,
                validation_report: best.report,
                attempts_used,
                validations,
                termination,
            };
        }
    }

    async fn refine(
        &self,
        spec: &Specification,
        code: &str,
        report: &ValidationReport,
    ) -> Result<ExtractedCode, OracleError> {
        let request = OracleRequest::new(REFINE_SYSTEM, refine_prompt(spec, code, report))
            .with_parameters(self.parameters.clone());
        let response = self.oracle.generate(request).await?;
        extract_code(&response.content).ok_or(OracleError::EmptyResponse)
    }
}
