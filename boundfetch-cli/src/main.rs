//! boundfetch CLI - fetch JSON endpoints through a bounded dispatcher.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use boundfetch::config::ConfigFile;
use boundfetch::logging::{init_logging, LogGuard};
use clap::{Parser, Subcommand};
use console::style;
use tokio::runtime::Runtime;

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "boundfetch", version, about)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: <config dir>/boundfetch/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch one or more JSON URLs
    Get(commands::get::GetArgs),
    /// List transports in priority order and whether each is available
    Transports,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = ConfigFile::load_or_default(cli.config.as_deref())?;
    let _guard = setup_logging(&config, cli.verbose)?;
    if let Some(path) = &cli.config {
        tracing::debug!(path = %path.display(), "Using configuration file");
    }

    let runtime = build_runtime()?;
    match cli.command {
        Command::Get(args) => commands::get::run(&runtime, &config, args),
        Command::Transports => commands::transports::run(&runtime, &config),
    }
}

fn setup_logging(config: &ConfigFile, verbose: u8) -> Result<LogGuard, CliError> {
    let mut logging = config.logging.clone();
    if let Some(level) = verbosity_level(verbose) {
        logging = logging.with_level(level);
    }
    Ok(init_logging(&logging)?)
}

/// Level override for the given number of `-v` flags.
fn verbosity_level(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

fn build_runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("boundfetch-worker")
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))
}
