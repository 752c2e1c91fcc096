//! CLI command implementations.

pub mod check_graph;
pub mod check_spec;
pub mod generate;
pub mod init;
pub mod run_examples;
