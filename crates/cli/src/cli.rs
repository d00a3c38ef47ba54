//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sensor Ingest - serial sensor station telemetry ingestion
#[derive(Parser, Debug)]
#[command(
    name = "sensor-ingest",
    author,
    version,
    about = "Serial sensor station telemetry ingestion",
    long_about = "Reads the line-oriented console output of a sensor station, groups it into \n\
                  marker-delimited frames, extracts typed readings and stores them in SQLite."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSOR_INGEST_VERBOSE")]
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
        env = "SENSOR_INGEST_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest readings until interrupted or the stream ends
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Show the most recent stored readings
    Recent(RecentArgs),

    /// Re-insert readings from the recovery journal
    Recover(RecoverArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "SENSOR_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read from this device node instead of the configured transport
    #[arg(long, env = "SENSOR_INGEST_DEVICE", conflicts_with_all = ["address", "stdin", "replay"])]
    pub device: Option<PathBuf>,

    /// Connect to a serial-over-TCP bridge (host:port)
    #[arg(long, env = "SENSOR_INGEST_ADDRESS", conflicts_with_all = ["stdin", "replay"])]
    pub address: Option<String>,

    /// Read lines from standard input
    #[arg(long, conflicts_with = "replay")]
    pub stdin: bool,

    /// Replay a capture file
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier
    #[arg(long, requires = "replay")]
    pub replay_speed: Option<f64>,

    /// Override the SQLite database path
    #[arg(long, env = "SENSOR_INGEST_DB")]
    pub db: Option<PathBuf>,

    /// Override the recovery journal path
    #[arg(long, env = "SENSOR_INGEST_JOURNAL")]
    pub journal: Option<PathBuf>,

    /// Append every received line to this capture file
    #[arg(long)]
    pub capture: Option<PathBuf>,

    /// Reconnect attempts after a transport fault (0 = terminate)
    #[arg(long)]
    pub reconnect_attempts: Option<u32>,

    /// Validate configuration and exit without opening the transport
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SENSOR_INGEST_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "station.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long, env = "SENSOR_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the field patterns
    #[arg(long)]
    pub patterns: bool,
}

/// Arguments for the `recent` command
#[derive(Parser, Debug)]
pub struct RecentArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long, env = "SENSOR_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the SQLite database path
    #[arg(long, env = "SENSOR_INGEST_DB")]
    pub db: Option<PathBuf>,

    /// Number of readings to show
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `recover` command
#[derive(Parser, Debug)]
pub struct RecoverArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long, env = "SENSOR_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the SQLite database path
    #[arg(long, env = "SENSOR_INGEST_DB")]
    pub db: Option<PathBuf>,

    /// Override the recovery journal path
    #[arg(long, env = "SENSOR_INGEST_JOURNAL")]
    pub journal: Option<PathBuf>,
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
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
