//! Generation-with-repair driver
//!
//! One generic retry loop for every structured artifact the oracle produces.
//! Each attempt runs the same stages: oracle call, JSON extraction, schema
//! check, typed construction and semantic check. The first failing stage
//! produces a repair prompt for the next attempt. A single budget is shared by
//! every failure category.

use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::models::ValidationIssue;
use crate::domain::ports::{FailureArchive, GenerationParameters, LlmOracle, OracleRequest};
use crate::services::response_parsing::parse_json_object;
use crate::services::schema_registry::{SchemaError, SchemaRegistry};

/// Terminal failure of a generation stage. Never retried by callers.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Every attempt failed
    #[error("{kind} generation failed after {attempts} attempt(s): {reason}")]
    Exhausted {
        /// Artifact kind, e.g. `specification`
        kind: String,
        /// Oracle calls spent
        attempts: u32,
        /// Failure reason of the last attempt
        reason: String,
        /// Raw text of the last oracle response
        last_raw_response: String,
        /// Where the failure record was written, if archiving succeeded
        archived_to: Option<PathBuf>,
    },

    /// The attempt budget was zero
    #[error("generation requires at least one attempt")]
    NoAttempts,

    /// The artifact schema is missing from the registry
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// What went wrong in a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// The oracle call itself failed
    Oracle,
    /// No JSON object could be extracted
    Parse,
    /// The JSON object failed schema validation
    Schema,
    /// Schema-valid JSON did not map onto the typed artifact
    Construct,
    /// The artifact failed semantic validation
    Semantic,
}

impl FailureCategory {
    /// Lowercase name used in archives and logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::Parse => "parse",
            Self::Schema => "schema",
            Self::Construct => "construct",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes one kind of artifact the driver can produce.
pub trait ArtifactSpec: Send + Sync {
    /// Typed artifact produced on success
    type Artifact: Send;

    /// Short name used in logs, archives and errors, e.g. `specification`.
    fn kind(&self) -> &'static str;

    /// Registry name of the JSON Schema the raw object must satisfy.
    fn schema_name(&self) -> &'static str;

    /// Build the typed artifact from schema-valid JSON.
    fn construct(&self, value: Value) -> Result<Self::Artifact, String>;

    /// Semantic validation. May normalize the artifact in place.
    ///
    /// Returns the non-blocking warnings, or the aggregated error message
    /// that goes into the next repair prompt.
    fn check(&self, artifact: &mut Self::Artifact) -> Result<Vec<ValidationIssue>, String>;
}

/// A successfully generated artifact.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    /// The validated artifact
    pub artifact: T,
    /// Non-blocking issues found during validation
    pub warnings: Vec<ValidationIssue>,
    /// Oracle calls spent, including the successful one
    pub attempts: u32,
    /// Raw text of the accepted oracle response
    pub raw_response: String,
}

struct AttemptFailure {
    category: FailureCategory,
    reason: String,
    repair_prompt: String,
}

/// Runs the generate, validate and repair cycle for structured artifacts.
pub struct RepairDriver {
    oracle: Arc<dyn LlmOracle>,
    schemas: Arc<SchemaRegistry>,
    archive: Arc<dyn FailureArchive>,
    parameters: GenerationParameters,
}

impl RepairDriver {
    /// Driver with default generation parameters
    pub fn new(
        oracle: Arc<dyn LlmOracle>,
        schemas: Arc<SchemaRegistry>,
        archive: Arc<dyn FailureArchive>,
    ) -> Self {
        Self {
            oracle,
            schemas,
            archive,
            parameters: GenerationParameters::default(),
        }
    }

    /// Override generation parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Drive the oracle until it yields a valid `A::Artifact`.
    ///
    /// Makes at most `max_attempts` oracle calls and returns on the first
    /// success. The system prompt is identical on every attempt.
    pub async fn generate<A: ArtifactSpec>(
        &self,
        spec: &A,
        initial_prompt: &str,
        system_prompt: &str,
        max_attempts: u32,
    ) -> Result<Generated<A::Artifact>, GenerationError> {
        if max_attempts == 0 {
            return Err(GenerationError::NoAttempts);
        }
        if !self.schemas.contains(spec.schema_name()) {
            return Err(SchemaError::NotFound(spec.schema_name().to_string()).into());
        }

        let kind = spec.kind();
        let mut prompt = initial_prompt.to_string();
        let mut last_raw = String::new();
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            tracing::debug!(kind, attempt, max_attempts, "Requesting artifact from oracle");

            let request = OracleRequest::new(system_prompt, prompt.clone())
                .with_parameters(self.parameters.clone());

            let outcome = match self.oracle.generate(request).await {
                Ok(response) => {
                    last_raw = response.content;
                    self.evaluate(spec, initial_prompt, &last_raw)
                }
                Err(err) => Err(AttemptFailure {
                    category: FailureCategory::Oracle,
                    reason: err.to_string(),
                    repair_prompt: prompt.clone(),
                }),
            };

            match outcome {
                Ok((artifact, warnings)) => {
                    for warning in &warnings {
                        tracing::warn!(kind, issue = %warning, "Artifact validation warning");
                    }
                    tracing::info!(kind, attempt, "Artifact generated");
                    return Ok(Generated {
                        artifact,
                        warnings,
                        attempts: attempt,
                        raw_response: last_raw,
                    });
                }
                Err(failure) => {
                    tracing::warn!(
                        kind,
                        attempt,
                        max_attempts,
                        category = %failure.category,
                        error = %failure.reason,
                        "Artifact attempt failed"
                    );
                    last_reason = format!("{}: {}", failure.category, failure.reason);
                    prompt = failure.repair_prompt;
                }
            }
        }

        let archived_to = match self.archive.archive(kind, &last_reason, &last_raw).await {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(kind, error = %err, "Failed to archive exhausted generation");
                None
            }
        };
        tracing::error!(kind, attempts = max_attempts, reason = %last_reason, "Generation budget exhausted");

        Err(GenerationError::Exhausted {
            kind: kind.to_string(),
            attempts: max_attempts,
            reason: last_reason,
            last_raw_response: last_raw,
            archived_to,
        })
    }

    fn evaluate<A: ArtifactSpec>(
        &self,
        spec: &A,
        initial_prompt: &str,
        raw: &str,
    ) -> Result<(A::Artifact, Vec<ValidationIssue>), AttemptFailure> {
        let value = parse_json_object(raw).map_err(|reason| AttemptFailure {
            category: FailureCategory::Parse,
            repair_prompt: parse_repair_prompt(initial_prompt, raw, &reason),
            reason,
        })?;

        let schema_errors = self
            .schemas
            .validate(spec.schema_name(), &value)
            .map_err(|err| AttemptFailure {
                category: FailureCategory::Schema,
                reason: err.to_string(),
                repair_prompt: initial_prompt.to_string(),
            })?;
        if !schema_errors.is_empty() {
            return Err(AttemptFailure {
                category: FailureCategory::Schema,
                reason: schema_errors.join("; "),
                repair_prompt: schema_repair_prompt(initial_prompt, raw, &schema_errors),
            });
        }

        let mut artifact = spec.construct(value).map_err(|reason| AttemptFailure {
            category: FailureCategory::Construct,
            repair_prompt: semantic_repair_prompt(initial_prompt, raw, &reason),
            reason,
        })?;

        let warnings = spec.check(&mut artifact).map_err(|reason| AttemptFailure {
            category: FailureCategory::Semantic,
            repair_prompt: semantic_repair_prompt(initial_prompt, raw, &reason),
            reason,
        })?;

        Ok((artifact, warnings))
    }
}

/// Repair prompt after a JSON extraction failure
pub fn parse_repair_prompt(initial_prompt: &str, raw: &str, error: &str) -> String {
    format!(
        "{initial_prompt}\n\n\
         Your previous response could not be parsed as JSON.\n\
         Parse error: {error}\n\n\
         Previous response:\n{raw}\n\n\
         Output ONLY the corrected JSON object. No prose, no markdown fences."
    )
}

/// Repair prompt listing schema violations
pub fn schema_repair_prompt(initial_prompt: &str, raw: &str, errors: &[String]) -> String {
    let bullets = errors
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{initial_prompt}\n\n\
         Your previous JSON does not match the required schema:\n{bullets}\n\n\
         Previous response:\n{raw}\n\n\
         Preserve every field that is already correct and fix only the errors listed above. \
         Output ONLY the corrected JSON object."
    )
}

/// Repair prompt carrying a semantic validation message
pub fn semantic_repair_prompt(initial_prompt: &str, raw: &str, message: &str) -> String {
    format!(
        "{initial_prompt}\n\n\
         Your previous JSON failed validation:\n{message}\n\n\
         Previous response:\n{raw}\n\n\
         Fix every issue listed above while keeping the rest unchanged. \
         Output ONLY the corrected JSON object."
    )
}
