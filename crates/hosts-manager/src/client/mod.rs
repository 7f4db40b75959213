//! Command-line front end for hosts-manager.
//!
//! Each invocation loads the configuration (CLI > env > file), builds a
//! service over the configured hosts file and runs one command against it.
//! `edit` and `delete` claim the entries currently at the given lines; `apply`
//! submits a batch recorded earlier, so a change made by someone else in the
//! meantime is reported as a conflict instead of being overwritten.

mod commands;
mod error;
mod output;

pub use error::{
    exit_code_for_error, format_service_error, EXIT_CONFLICT, EXIT_ERROR, EXIT_SUCCESS,
    EXIT_USAGE,
};

use crate::server::config::Config;
use crate::server::service::ServiceError;
use crate::server::{build_service, tracing_setup};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Parser)]
#[command(name = "hosts-manager")]
#[command(about = "Edit a hosts file without clobbering concurrent changes", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Hosts file to manage (overrides config and HOSTS_MANAGER_FILE)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List entries with their line numbers
    List,
    /// Append a new entry
    Add {
        /// IP address (IPv4 or IPv6)
        #[arg(long)]
        address: String,
        /// Hostname, optionally followed by space-separated aliases
        #[arg(long)]
        hostname: String,
        /// Optional comment
        #[arg(long)]
        comment: Option<String>,
        /// Write the entry commented out
        #[arg(long)]
        disabled: bool,
    },
    /// Change the entry currently at LINE
    Edit {
        /// Line number as shown by `list`
        line: usize,
        /// New address
        #[arg(long)]
        address: Option<String>,
        /// New hostname and aliases
        #[arg(long)]
        hostname: Option<String>,
        /// New comment (empty string to clear)
        #[arg(long)]
        comment: Option<String>,
        /// Uncomment the entry
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        /// Comment the entry out
        #[arg(long)]
        disable: bool,
    },
    /// Delete the entries currently at the given lines
    Delete {
        /// Line numbers as shown by `list`
        #[arg(required = true)]
        lines: Vec<usize>,
    },
    /// Submit a JSON batch request
    Apply {
        /// Batch file, or `-` for stdin
        file: PathBuf,
    },
    /// Show effective configuration
    Config,
}

pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    tracing_setup::init(cli.quiet);

    let config = match Config::load(cli.config.as_deref(), cli.file.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Ok(ExitCode::from(EXIT_USAGE as u8));
        }
    };

    if matches!(cli.command, Commands::Config) {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    let service = build_service(&config);
    let result = commands::handle(&service, cli.command, cli.format, cli.quiet).await;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            if let Some(err) = e.downcast_ref::<ServiceError>() {
                eprintln!("{}", format_service_error(err));
                Ok(ExitCode::from(exit_code_for_error(err) as u8))
            } else if let Some(err) = e.downcast_ref::<commands::UsageError>() {
                eprintln!("{}", err);
                Ok(ExitCode::from(EXIT_USAGE as u8))
            } else {
                eprintln!("Error: {:#}", e);
                Ok(ExitCode::from(EXIT_ERROR as u8))
            }
        }
    }
}
