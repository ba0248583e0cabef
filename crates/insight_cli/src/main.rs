//! InsightFlow CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Format error
//! - 4: Missing column
//! - 5: I/O error

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use insight_core::CoreError;
use insight_data::DataError;

mod commands;

use commands::{AppContext, Cli, Commands};

/// Log file written inside the log directory.
const LOG_FILE: &str = "insightflow.log";

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const FORMAT_ERROR: u8 = 3;
    pub const MISSING_COLUMN: u8 = 4;
    pub const IO_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.global.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            return ExitCode::from(categorize_error(&e));
        }
    };

    init_logging(&config.log_dir, cli.global.verbose);

    let ctx = AppContext {
        config,
        offline: cli.global.offline,
    };

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, &ctx).await,
        Commands::Demo(args) => commands::demo::execute(args, &ctx).await,
        Commands::Generate(args) => commands::generate::execute(args).await,
        Commands::History(args) => commands::history::execute(args, &ctx).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            tracing::error!("{:#}", e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Console output on stderr plus a plain-text log file.
///
/// A log file that cannot be opened only disables the file layer.
fn init_logging(log_dir: &Path, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "insight_cli={lvl},insight_core={lvl},insight_data={lvl},insight_agents={lvl},warn",
            lvl = default_level
        ))
    });

    let file_layer = match open_log_file(log_dir) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        ),
        Err(e) => {
            eprintln!("⚠️  Logging to {} disabled: {}", log_dir.display(), e);
            None
        }
    };

    let log_result = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

fn open_log_file(log_dir: &Path) -> std::io::Result<File> {
    fs::create_dir_all(log_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))
}

/// Map an error to an exit code by walking its source chain.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(data) = cause.downcast_ref::<DataError>() {
            return match data {
                DataError::Format(_) | DataError::InvalidValue { .. } => ExitCodes::FORMAT_ERROR,
                DataError::MissingColumn(_) => ExitCodes::MISSING_COLUMN,
                DataError::Io(_) => ExitCodes::IO_ERROR,
            };
        }
        if let Some(CoreError::Config(_)) = cause.downcast_ref::<CoreError>() {
            return ExitCodes::INVALID_ARGS;
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return ExitCodes::IO_ERROR;
        }
    }
    ExitCodes::GENERAL_ERROR
}
