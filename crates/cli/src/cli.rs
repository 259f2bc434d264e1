//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Lapscounter - lap counting server for robot races
#[derive(Parser, Debug)]
#[command(
    name = "lapscounter",
    author,
    version,
    about = "Robot race lap counting server",
    long_about = "Counts laps of robots crossing gates on a circuit.\n\n\
                  Gate sensors and race consoles connect over WebSocket; the server \n\
                  validates crossings, ranks the robots and broadcasts race state."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LAPSCOUNTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LAPSCOUNTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the race server
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "LAPSCOUNTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override server bind host from configuration
    #[arg(long, env = "LAPSCOUNTER_HOST")]
    pub host: Option<String>,

    /// Override server port from configuration
    #[arg(long, env = "LAPSCOUNTER_PORT")]
    pub port: Option<u16>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "LAPSCOUNTER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without starting the server
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "lapscounter.toml", env = "LAPSCOUNTER_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long, env = "LAPSCOUNTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, conflicts_with = "toml")]
    pub json: bool,

    /// Output as TOML
    #[arg(long)]
    pub toml: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
