//! End-to-end generation session
//!
//! Requirement text goes through these stages in order:
//! 1. specification
//! 2. step graph (optional)
//! 3. logic
//! 4. implementation
//! 5. validate/refine
//!
//! Each stage finishes before the next begins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::{
    Config, Specification, StepGraph, ValidationIssue, ValidationReport,
};
use crate::domain::ports::{
    CodeExecutor, FailureArchive, GenerationParameters, LlmOracle, OracleRequest,
};
use crate::services::artifacts::{SpecificationArtifact, StepGraphArtifact};
use crate::services::logic_skeleton::LogicSkeleton;
use crate::services::prompts;
use crate::services::refine_loop::{RefineLoop, RefineOutcome, Termination};
use crate::services::repair_driver::RepairDriver;
use crate::services::response_parsing::extract_code;
use crate::services::schema_registry::SchemaRegistry;
use crate::services::test_harness::TestHarness;

/// Budgets and switches for one session.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Oracle calls allowed per structured artifact
    pub max_attempts: u32,
    /// Refinements allowed after the first validation
    pub max_refine_attempts: u32,
    /// Plan with a step graph instead of free-form logic
    pub step_graph: bool,
    /// Generation parameters for every oracle call
    pub parameters: GenerationParameters,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_attempts: config.generation.max_attempts,
            max_refine_attempts: config.refine.max_refine_attempts,
            step_graph: config.generation.step_graph,
            parameters: GenerationParameters {
                model: Some(config.oracle.model.clone()),
                max_tokens: Some(config.oracle.max_tokens),
                temperature: Some(config.oracle.temperature),
                timeout_secs: Some(config.oracle.timeout_secs),
            },
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Pipeline stage, reported on hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Drafting the specification
    Specification,
    /// Planning the step graph
    StepGraph,
    /// Writing free-form logic
    Logic,
    /// Producing and refining code
    Implementation,
}

impl Stage {
    /// Snake-case stage name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Specification => "specification",
            Self::StepGraph => "step_graph",
            Self::Logic => "logic",
            Self::Implementation => "implementation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every example passes
    Success,
    /// Code exists but examples still fail
    PartialSuccess {
        /// Pass count and refinements used
        detail: String,
    },
    /// No usable code was produced
    HardFailure {
        /// Stage that failed
        stage: Stage,
        /// Terminal error
        error: String,
    },
}

/// Everything a session produced, whatever its status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Unique per run
    pub session_id: Uuid,
    /// How the session ended
    #[serde(flatten)]
    pub status: PipelineStatus,
    /// Validated specification, if reached
    pub specification: Option<Specification>,
    /// Validated step graph, if reached
    pub step_graph: Option<StepGraph>,
    /// Logic handed to implementation
    pub logic: Option<String>,
    /// Best code produced
    pub code: Option<String>,
    /// Oracle's explanation of the code
    pub explanation: Option<String>,
    /// Latest validation report
    pub report: Option<ValidationReport>,
    /// Refinements applied
    pub attempts_used: u32,
    /// Non-blocking issues from every stage
    pub warnings: Vec<ValidationIssue>,
}

impl PipelineOutcome {
    fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            status: PipelineStatus::Success,
            specification: None,
            step_graph: None,
            logic: None,
            code: None,
            explanation: None,
            report: None,
            attempts_used: 0,
            warnings: Vec::new(),
        }
    }

    /// Whether every example passed
    pub const fn is_success(&self) -> bool {
        matches!(self.status, PipelineStatus::Success)
    }

    fn fail(mut self, stage: Stage, error: impl fmt::Display) -> Self {
        tracing::error!(session_id = %self.session_id, %stage, error = %error, "Pipeline stage failed");
        self.status = PipelineStatus::HardFailure {
            stage,
            error: error.to_string(),
        };
        self
    }
}

/// Chains every stage of one generation session.
pub struct CodegenPipeline {
    oracle: Arc<dyn LlmOracle>,
    driver: RepairDriver,
    refine: RefineLoop,
    settings: PipelineSettings,
}

impl CodegenPipeline {
    /// Wire the pipeline to its collaborators
    pub fn new(
        oracle: Arc<dyn LlmOracle>,
        executor: Arc<dyn CodeExecutor>,
        schemas: Arc<SchemaRegistry>,
        archive: Arc<dyn FailureArchive>,
        settings: PipelineSettings,
    ) -> Self {
        let driver = RepairDriver::new(Arc::clone(&oracle), schemas, archive)
            .with_parameters(settings.parameters.clone());
        let refine = RefineLoop::new(Arc::clone(&oracle), TestHarness::new(executor))
            .with_parameters(settings.parameters.clone());
        Self {
            oracle,
            driver,
            refine,
            settings,
        }
    }

    /// Run one session. Failures are reported in the outcome, not returned.
    pub async fn run(&self, requirement: &str) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::new(Uuid::new_v4());
        let session_id = outcome.session_id;
        tracing::info!(%session_id, step_graph = self.settings.step_graph, "Starting generation session");

        if requirement.trim().is_empty() {
            return outcome.fail(Stage::Specification, "Requirement cannot be empty");
        }

        let spec = match self
            .driver
            .generate(
                &SpecificationArtifact,
                &prompts::specification_prompt(requirement),
                prompts::SPECIFICATION_SYSTEM,
                self.settings.max_attempts,
            )
            .await
        {
            Ok(generated) => {
                outcome.warnings.extend(generated.warnings);
                generated.artifact
            }
            Err(err) => return outcome.fail(Stage::Specification, err),
        };
        tracing::info!(%session_id, function = spec.name(), "Specification ready");

        let spec_json = match spec.to_json_pretty() {
            Ok(json) => json,
            Err(err) => return outcome.fail(Stage::Specification, err),
        };
        outcome.specification = Some(spec.clone());

        let logic = if self.settings.step_graph {
            let artifact = StepGraphArtifact::for_spec(&spec);
            let ids = spec.predicate_ids();
            match self
                .driver
                .generate(
                    &artifact,
                    &prompts::step_graph_prompt(&spec_json, &ids),
                    prompts::STEP_GRAPH_SYSTEM,
                    self.settings.max_attempts,
                )
                .await
            {
                Ok(generated) => {
                    outcome.warnings.extend(generated.warnings);
                    let skeleton = LogicSkeleton::from_step_graph(&spec, &generated.artifact);
                    tracing::info!(%session_id, anchors = skeleton.anchors().len(), "Step graph ready");
                    outcome.step_graph = Some(generated.artifact);
                    skeleton.render()
                }
                Err(err) => return outcome.fail(Stage::StepGraph, err),
            }
        } else {
            let request = OracleRequest::new(
                prompts::LOGIC_SYSTEM,
                prompts::logic_prompt(&spec, &spec_json),
            )
            .with_parameters(self.settings.parameters.clone());
            match self.oracle.generate(request).await {
                Ok(response) if !response.content.trim().is_empty() => response.content,
                Ok(_) => return outcome.fail(Stage::Logic, "Oracle returned empty logic"),
                Err(err) => return outcome.fail(Stage::Logic, err),
            }
        };
        outcome.logic = Some(logic.clone());

        let request = OracleRequest::new(
            prompts::IMPLEMENTATION_SYSTEM,
            prompts::implementation_prompt(&spec, &spec_json, &logic),
        )
        .with_parameters(self.settings.parameters.clone());
        let implementation = match self.oracle.generate(request).await {
            Ok(response) => match extract_code(&response.content) {
                Some(extracted) => extracted,
                None => return outcome.fail(Stage::Implementation, "Oracle returned no code"),
            },
            Err(err) => return outcome.fail(Stage::Implementation, err),
        };
        tracing::info!(%session_id, lines = implementation.code.lines().count(), "Implementation ready");

        let refined = self
            .refine
            .run(
                &implementation.code,
                &implementation.explanation,
                &spec,
                self.settings.max_refine_attempts,
            )
            .await;
        Self::finish(outcome, refined)
    }

    fn finish(mut outcome: PipelineOutcome, refined: RefineOutcome) -> PipelineOutcome {
        outcome.status = match &refined.termination {
            Termination::Passed => PipelineStatus::Success,
            Termination::BudgetExhausted => PipelineStatus::PartialSuccess {
                detail: format!(
                    "{}/{} tests passing after {} refinement(s)",
                    refined.validation_report.passed_count,
                    refined.validation_report.total_tests,
                    refined.attempts_used
                ),
            },
            Termination::RefinementFailed(err) => PipelineStatus::PartialSuccess {
                detail: format!("refinement stopped: {err}"),
            },
        };
        tracing::info!(
            session_id = %outcome.session_id,
            success = refined.success,
            attempts_used = refined.attempts_used,
            "Generation session finished"
        );
        outcome.code = Some(refined.code);
        outcome.explanation = Some(refined.explanation);
        outcome.report = Some(refined.validation_report);
        outcome.attempts_used = refined.attempts_used;
        outcome
    }
}
