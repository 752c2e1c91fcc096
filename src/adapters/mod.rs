//! Infrastructure adapters for external systems.

pub mod executors;
pub mod failure_archive;
pub mod oracles;

pub use executors::PythonSubprocessExecutor;
pub use failure_archive::FileFailureArchive;
pub use oracles::{MockOracle, OracleRegistry};
