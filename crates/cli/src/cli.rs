//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::SuccessPolicy;
use std::path::PathBuf;

/// imgstore - bounded-concurrency image store
#[derive(Parser, Debug)]
#[command(
    name = "imgstore",
    author,
    version,
    about = "Bounded-concurrency image upload dispatcher",
    long_about = "Admits base64 data-URL image uploads, queues them FIFO and runs at most \n\
                  N decode-and-store jobs at once, replicating every image into each \n\
                  configured save root with an atomic temp-file-then-rename write."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "IMGSTORE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "IMGSTORE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read upload requests and store them
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "IMGSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Newline-delimited JSON upload requests ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    /// Wait for every job and report its outcome
    #[arg(long)]
    pub wait: bool,

    /// Override the number of concurrent execution units
    #[arg(long, env = "WORKER_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Override the save roots (comma separated, blanks ignored)
    #[arg(long, env = "SAVE_ROOTS", value_delimiter = ',')]
    pub save_roots: Option<Vec<String>>,

    /// Override the job success policy
    #[arg(long, value_enum)]
    pub success_policy: Option<PolicyArg>,

    /// Validate configuration and exit without reading input
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "IMGSTORE_METRICS_PORT")]
    pub metrics_port: u16,
}

impl RunArgs {
    /// `--save-roots` entries, trimmed, empty entries dropped
    pub fn save_root_overrides(&self) -> Option<Vec<PathBuf>> {
        self.save_roots.as_ref().map(|roots| {
            roots
                .iter()
                .map(|root| root.trim())
                .filter(|root| !root.is_empty())
                .map(PathBuf::from)
                .collect()
        })
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "imgstore.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long, env = "IMGSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
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

/// Job success policy
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PolicyArg {
    /// Succeed once every root has been attempted
    BestEffort,
    /// Fail when no configured root was written
    RequireAny,
}

impl From<PolicyArg> for SuccessPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::BestEffort => SuccessPolicy::BestEffort,
            PolicyArg::RequireAny => SuccessPolicy::RequireAny,
        }
    }
}
