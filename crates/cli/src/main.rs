//! Bookfair CLI - vendor and employee portal from the terminal

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "bookfair")]
#[command(about = "Book-fair stall reservation portal")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// State directory for the session file, config and logs
    #[arg(short = 'd', long, global = true, env = "BOOKFAIR_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Configuration file (defaults to <state dir>/config.toml when present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides the configuration
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let state_dir = config::state_dir(cli.state_dir);
    logging::init_logging(cli.log_level.into(), &state_dir, cli.no_file_log)?;

    let mut portal = config::PortalConfig::load(cli.config.as_deref(), &state_dir)?;
    if let Some(base_url) = cli.base_url {
        portal.base_url = base_url;
    }
    info!(base_url = %portal.base_url, "Starting bookfair CLI");

    let run = cli.command.execute(portal, state_dir);
    let outcome = if cli.timeout == 0 {
        Ok(run.await)
    } else {
        tokio::time::timeout(Duration::from_secs(cli.timeout), run).await
    };

    match outcome {
        Ok(Ok(())) => {
            info!("Command completed successfully");
        }
        Ok(Err(e)) => {
            error!("Command failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
        Err(_) => {
            error!("Command timed out after {} seconds", cli.timeout);
            eprintln!("Error: timed out after {} seconds", cli.timeout);
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
