//! Service layer: validators, the repair driver, the refine loop and the
//! pipeline that strings them together.

pub mod artifacts;
pub mod logic_skeleton;
pub mod pipeline;
pub mod predicate;
pub mod prompts;
pub mod refine_loop;
pub mod repair_driver;
pub mod response_parsing;
pub mod schema_registry;
pub mod spec_validator;
pub mod step_graph_validator;
pub mod test_harness;

pub use artifacts::{SpecificationArtifact, StepGraphArtifact};
pub use logic_skeleton::LogicSkeleton;
pub use pipeline::{CodegenPipeline, PipelineOutcome, PipelineSettings, PipelineStatus, Stage};
pub use predicate::validate_expr;
pub use refine_loop::{RefineLoop, RefineOutcome, Termination};
pub use repair_driver::{ArtifactSpec, FailureCategory, Generated, GenerationError, RepairDriver};
pub use schema_registry::{SchemaError, SchemaRegistry};
pub use spec_validator::{SpecValidationError, SpecValidator};
pub use step_graph_validator::{StepGraphValidationError, StepGraphValidator};
pub use test_harness::TestHarness;
