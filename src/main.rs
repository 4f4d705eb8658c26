//! Autorename CLI entry point.

use clap::Parser;
use std::process::ExitCode;

use autorename::cli::commands::{instrument, rename, run};
use autorename::cli::{handle_error, Cli, Commands};
use autorename::domain::models::Config;
use autorename::infrastructure::config::ConfigLoader;
use autorename::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            handle_error(&err, cli.json);
            return ExitCode::FAILURE;
        }
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => {
            handle_error(&err, cli.json);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Run { start_all } => run::execute(&config, start_all, cli.json).await,
        Commands::Instrument(command) => instrument::execute(command, &config, cli.json),
        Commands::Rename { ref file, kind, dry_run } => {
            rename::execute(file, kind, dry_run, &config, cli.json).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            handle_error(&err, cli.json);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}
