//! CLI argument definitions using clap.

use std::path::PathBuf;

use aranet_core::GapPolicy;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reusable device arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device address (MAC address or UUID), or use ARANET_MAC env var
    #[arg(short, long, env = "ARANET_MAC")]
    pub device: Option<String>,

    /// How long to scan when no device is given, in seconds
    #[arg(long, default_value = "10")]
    pub scan_timeout: u64,
}

/// Pushover credentials
#[derive(Debug, Clone, Args)]
pub struct PushoverArgs {
    /// Pushover application token
    #[arg(long, env = "PUSHOVER_TOKEN", hide_env_values = true)]
    pub pushover_token: Option<String>,

    /// Pushover user key
    #[arg(long, env = "PUSHOVER_USER", hide_env_values = true)]
    pub pushover_user: Option<String>,

    /// Only log alerts, never push them
    #[arg(long)]
    pub no_notify: bool,
}

/// Date format arguments for CSV exchange
#[derive(Debug, Clone, Args)]
pub struct CsvArgs {
    /// Date format of the time column (time crate format description)
    #[arg(long)]
    pub date_format: Option<String>,
}

#[derive(Parser)]
#[command(name = "aranet-monitor")]
#[command(author, version, about = "Live monitor for Aranet4 sensors", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// History database path
    #[arg(long, global = true, env = "ARANET_DB")]
    pub database: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, global = true, env = "ARANET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow a device live, record its readings and raise alerts
    Watch {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        pushover: PushoverArgs,

        /// What to do with a reading that follows a missed measurement
        #[arg(long)]
        gap_policy: Option<GapPolicy>,

        /// Keep history in memory only
        #[arg(long)]
        dry_run: bool,
    },

    /// Download the records kept on the device into history
    Sync {
        #[command(flatten)]
        device: DeviceArgs,

        /// Pause between history requests, in milliseconds
        #[arg(long, default_value = "50")]
        read_delay: u64,
    },

    /// Show statistics of the recorded history
    History {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output as JSON (shorthand for --format json)
        #[arg(long)]
        json: bool,

        /// List records instead of the summary
        #[arg(short, long)]
        list: bool,

        /// Only records at or after this time (RFC3339 or YYYY-MM-DD)
        #[arg(long, requires = "list")]
        since: Option<String>,

        /// Only records at or before this time (RFC3339 or YYYY-MM-DD)
        #[arg(long, requires = "list")]
        until: Option<String>,

        /// Maximum number of records to list (0 for all)
        #[arg(short = 'n', long, default_value = "20", requires = "list")]
        limit: u32,
    },

    /// Scan for nearby Aranet devices
    Scan {
        /// Scan timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Include devices that are not Aranet sensors
        #[arg(long)]
        all: bool,
    },

    /// Import records from a CSV file exported by the Aranet app
    Import {
        /// CSV file to read
        file: PathBuf,

        #[command(flatten)]
        csv: CsvArgs,
    },

    /// Export recorded history to a CSV file
    Export {
        /// CSV file to write
        file: PathBuf,

        #[command(flatten)]
        csv: CsvArgs,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
