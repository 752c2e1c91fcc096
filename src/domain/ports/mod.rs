//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces the adapters implement:
//! - LlmOracle: text generation
//! - CodeExecutor: isolated execution of candidate code
//! - FailureArchive: offline record of exhausted generations

pub mod code_executor;
pub mod failure_archive;
pub mod oracle;

pub use code_executor::{CodeExecutor, ExecutorError};
pub use failure_archive::{FailureArchive, NullFailureArchive};
pub use oracle::{
    GenerationParameters, HealthStatus, LlmOracle, OracleError, OracleRequest, OracleResponse,
    StopReason, TokenUsage,
};
