//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{
    check_graph::CheckGraphArgs, check_spec::CheckSpecArgs, generate::GenerateArgs,
    init::InitArgs, run_examples::RunExamplesArgs,
};

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(name = "specforge")]
#[command(about = "SpecForge - specification-first code generation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to .specforge/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize SpecForge configuration in a project
    Init(InitArgs),

    /// Generate a specification, logic and code from a requirement
    Generate(GenerateArgs),

    /// Validate a specification document
    CheckSpec(CheckSpecArgs),

    /// Validate a step graph against a specification
    CheckGraph(CheckGraphArgs),

    /// Run a specification's examples against existing code
    RunExamples(RunExamplesArgs),
}
