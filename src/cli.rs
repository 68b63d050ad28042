//! Command Line Interface

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::pipeline::DEFAULT_LP_PATH;

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Allocate campaign items across customer records to maximise expected revenue.
#[derive(Debug, Parser)]
#[command(name = "outreach", version)]
pub struct RunArgs {
    /// Campaign dataset (CSV with one header row)
    pub input: PathBuf,

    /// Plan configuration (YAML); the reference plan is used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the solved model in CPLEX LP format
    #[arg(long, default_value = DEFAULT_LP_PATH)]
    pub lp_out: PathBuf,

    /// Logging settings
    #[command(flatten)]
    pub logging: LoggingConfig,
}
