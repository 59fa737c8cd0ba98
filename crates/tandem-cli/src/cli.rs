use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages (default)
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per resource
    #[default]
    Text,
    /// JSON array of reports
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(about = "tandem - keep Status and Done in step across a markdown task vault")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault root directory
    #[arg(long, global = true, env = "TANDEM_VAULT", default_value = ".")]
    pub vault: PathBuf,

    /// Config file (TOML, YAML or JSON). Built-in defaults when omitted
    #[arg(short = 'C', long, global = true, env = "TANDEM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Set log level (off, error, warn, info, debug, trace)
    /// RUST_LOG directives are applied on top
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Report output format
    #[arg(short = 'f', long, global = true, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl Cli {
    /// Effective log level: explicit flag, then `--verbose`, then info.
    pub fn level(&self) -> LevelFilter {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level.into(),
            (None, true) => LevelFilter::DEBUG,
            (None, false) => LevelFilter::INFO,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch the vault and synchronize fields as files change (until Ctrl-C)
    Watch {
        /// Filesystem event debounce window in milliseconds
        #[arg(long, default_value = "100")]
        debounce_ms: u64,

        /// Reconcile every tracked resource once before watching
        #[arg(long)]
        reconcile_first: bool,
    },

    /// Report resources whose Done flag disagrees with their Status
    Check,

    /// Fix every inconsistent resource once and exit
    Reconcile,
}
