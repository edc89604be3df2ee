mod cleanup;
mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rulebatch_core::{load_layered_config, validate_config, BatchOrchestrator, ConsoleReporter};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the worker report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_layered_config(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load configuration")?;
    validate_config(&config).context("Configuration validation failed")?;

    let options = config
        .batch_options()
        .dry_run(cli.dry_run)
        .list_only(cli.list_files);

    info!(
        "Running {} with rules {:?}",
        config.worker_command.join(" "),
        config.rules_file
    );

    let reporter = Arc::new(ConsoleReporter::stdout(config.summary_format));
    let orchestrator = BatchOrchestrator::with_processes(reporter);

    let outcome = orchestrator
        .run(
            &cli.source_files,
            &config.rules_file,
            &config.output_directory,
            &options,
        )
        .await
        .context("Batch aborted")?;

    if cli.remove_sources && !options.dry_run {
        let removed = cleanup::remove_converted_sources(outcome.workers()).await;
        info!("Removed {} converted source file(s)", removed);
    }

    Ok(outcome.exit_code())
}
