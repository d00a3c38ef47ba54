//! # Sensor Ingest CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - configuration loading and validation
//! - ingestion start-up and graceful shutdown
//! - stored reading queries and journal recovery

mod cli;
mod commands;
mod error;

use std::process::ExitCode;

use clap::Parser;
use observability::ObservabilityConfig;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_ingest, run_recent, run_recover, run_validate};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let status = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(status);
        }
    };

    let logging = ObservabilityConfig {
        log_format: cli.log_format.into(),
        ..Default::default()
    }
    .with_verbosity(cli.verbose, cli.quiet);

    if let Err(e) = observability::init_with_config(logging) {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "sensor-ingest starting");

    let result = match &cli.command {
        Commands::Run(args) => run_ingest(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Recent(args) => run_recent(args).await,
        Commands::Recover(args) => run_recover(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            ExitCode::from(error::exit_status(&e))
        }
    }
}
