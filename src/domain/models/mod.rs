//! Data model: configuration, specifications, step graphs, execution reports and validation issues.

pub mod config;
pub mod execution;
pub mod specification;
pub mod step_graph;
pub mod validation;

pub use config::{
    Config, ExecutorConfig, GenerationConfig, LoggingConfig, OracleConfig, OracleProvider,
    RefineConfig,
};
pub use execution::{ExecutionResult, ExecutionStatus, TestResult, ValidationReport};
pub use specification::{
    ComplexityGuarantee, Example, ExampleKind, ExamplesBundle, ExceptionSpec, FunctionException,
    FunctionSpec, MetamorphicRelation, OracleSpec, Parameter, Predicate, PredicateIds,
    RelationKind, Signature, Specification, TypeDescriptor, TypesModel, RESERVED_RESULT_NAMES,
    SPEC_VERSION,
};
pub use step_graph::{Step, StepGraph};
pub use validation::{partition_issues, IssueCode, Severity, ValidationIssue};
