//! SpecForge - specification-first code generation
//!
//! SpecForge turns a natural-language requirement into a formal function
//! specification, a step graph that covers every predicate of that
//! specification, and a Python implementation that is checked against the
//! specification's own examples and refined until it passes.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Specification and step-graph models, port traits
//! - **Service Layer** (`services`): Validators, the repair driver and the refine loop
//! - **Adapters** (`adapters`): LLM oracles, the Python executor, failure archive
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use specforge::{CodegenPipeline, ConfigLoader, OracleRegistry, PipelineSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let pipeline = CodegenPipeline::new(
//!         OracleRegistry::new(config.oracle.clone()).create()?,
//!         Arc::new(specforge::PythonSubprocessExecutor::new(&config.executor)),
//!         Arc::new(specforge::SchemaRegistry::builtin()?),
//!         Arc::new(specforge::domain::ports::NullFailureArchive),
//!         PipelineSettings::from(&config),
//!     );
//!     let outcome = pipeline.run("Return the largest element of a non-empty list").await;
//!     println!("{:?}", outcome.status);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{FileFailureArchive, MockOracle, OracleRegistry, PythonSubprocessExecutor};
pub use domain::models::{
    Config, IssueCode, Severity, Specification, StepGraph, ValidationIssue, ValidationReport,
};
pub use domain::ports::{CodeExecutor, FailureArchive, LlmOracle, OracleError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    validate_expr, CodegenPipeline, PipelineOutcome, PipelineSettings, PipelineStatus,
    RefineLoop, RepairDriver, SchemaRegistry, SpecValidator, StepGraphValidator, TestHarness,
};
