//! Code executor port
//!
//! Runs a code snippet to completion inside an isolated scope. Each call must
//! start from a clean state: nothing defined by one run is visible to the next.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::models::ExecutionResult;

/// Infrastructure failures of the executor itself.
///
/// A snippet that raises or exits non-zero is not an error here; it is an
/// `ExecutionResult` with `ExecutionStatus::Failure`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    /// The interpreter could not be started
    #[error("Failed to start interpreter: {0}")]
    SpawnFailed(String),

    /// Pipes to or from the child failed
    #[error("Executor I/O error: {0}")]
    Io(String),

    /// A global name cannot be bound safely
    #[error("Invalid global binding '{0}'")]
    InvalidGlobal(String),
}

/// Runs candidate code in a fresh, isolated scope.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run `code` with `globals` bound as top-level names.
    async fn run(
        &self,
        code: &str,
        globals: &HashMap<String, Value>,
    ) -> Result<ExecutionResult, ExecutorError>;
}
