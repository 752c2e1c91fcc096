//! SpecForge CLI entry point.

use clap::Parser;

use specforge::cli::{commands, handle_error, load_config, Cli, Commands};
use specforge::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let mut log_config = LogConfig::from(&config.logging);
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, cli.json).await,
        Commands::Generate(args) => commands::generate::execute(args, &config, cli.json).await,
        Commands::CheckSpec(args) => commands::check_spec::execute(args, &config, cli.json).await,
        Commands::CheckGraph(args) => commands::check_graph::execute(args, &config, cli.json).await,
        Commands::RunExamples(args) => {
            commands::run_examples::execute(args, &config, cli.json).await
        }
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
