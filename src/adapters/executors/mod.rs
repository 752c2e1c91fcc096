//! Code executor implementations.

pub mod python_subprocess;

pub use python_subprocess::{security_check, PythonSubprocessExecutor};
