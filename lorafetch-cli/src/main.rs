use std::sync::Arc;

use clap::Parser;
use indicatif::MultiProgress;
use tracing::{Level, debug, error};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;

mod cli;
mod commands;
mod config;
mod error;
mod utils;

use cli::{CliArgs, Command};
use config::ProgramConfig;
use error::AppError;
use utils::progress::{ProgressManager, SuspendingWriter};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs, multi: &MultiProgress) -> Result<(), AppError> {
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // stdout carries the command output, logs go to stderr around the bars
    let stderr = SuspendingWriter::new(multi.clone(), std::io::stderr);
    let result = match &args.log_file {
        Some(path) => {
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_writer(MakeWriterExt::and(stderr, Arc::new(log_file)))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_writer(stderr)
                .with_ansi(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };
    result.map_err(|e| AppError::Initialization(e.to_string()))
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();
    let multi = MultiProgress::new();
    init_logging(&args, &multi)?;

    let config = ProgramConfig::from_args(&args)?;
    debug!(
        cache_dir = ?config.cache_dir,
        member = %config.fetcher.member_target.suffix(),
        "Configuration loaded"
    );

    match &args.command {
        Command::Fetch(fetch) => {
            let progress = if config.show_progress {
                ProgressManager::new(multi)
            } else {
                ProgressManager::new_disabled(multi)
            };
            commands::fetch(&fetch.urls, &config, progress).await
        }
        Command::Path { urls } => commands::path(urls, &config),
        Command::List => commands::list(&config).await,
        Command::Clear { urls, all } => commands::clear(urls, *all, &config).await,
    }
}
