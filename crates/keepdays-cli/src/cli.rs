//! CLI command definitions and argument parsing.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use keepdays_domain::Tier;
use std::path::PathBuf;

/// Keepdays CLI - Assign and maintain keep-days retention tags on backup archives.
#[derive(Debug, Parser)]
#[command(name = "keepdays")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "KEEPDAYS_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database holding the bucket contents
    #[arg(long, global = true, env = "KEEPDAYS_DB", default_value = "keepdays.db")]
    pub db: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (keys only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse archive keys and show their group and date parts
    Parse(ParseArgs),

    /// Build an archive key from a file name and timestamp
    Key(KeyArgs),

    /// Register or remove objects in the bucket database
    Put(PutArgs),

    /// Show tiers and keep-days without writing anything
    Classify(ClassifyArgs),

    /// Tag newly uploaded archives
    Tag(TagArgs),

    /// Raise missing or too-low tags across the whole bucket
    Reconcile(ReconcileArgs),

    /// Handle an event payload (upload notification or scheduled trigger)
    Handle(HandleArgs),

    /// Reconcile on a schedule until interrupted
    Watch(WatchArgs),

    /// Print the effective configuration
    Config,
}

/// Arguments for the parse command.
#[derive(Debug, Parser)]
pub struct ParseArgs {
    /// Archive keys (YYYY-MM-DD/HH-MM-SS_group.ext)
    #[arg(required = true)]
    pub keys: Vec<String>,
}

/// Arguments for the key command.
#[derive(Debug, Parser)]
pub struct KeyArgs {
    /// File name of the archive (e.g. documents.tar.gz)
    pub filename: String,

    /// Archive timestamp (defaults to now, UTC)
    #[arg(short, long, value_parser = parse_timestamp)]
    pub at: Option<NaiveDateTime>,
}

/// Arguments for the put command.
#[derive(Debug, Parser)]
pub struct PutArgs {
    /// Object keys to register
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Bucket name (defaults to the configured archive bucket)
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Object size in bytes
    #[arg(short, long)]
    pub size: Option<u64>,

    /// Remove the objects (and their tags) instead
    #[arg(long, conflicts_with = "size")]
    pub remove: bool,
}

/// Arguments for the classify command.
#[derive(Debug, Parser)]
pub struct ClassifyArgs {
    /// Bucket name (defaults to the configured archive bucket)
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Restrict to one archive group
    #[arg(short, long)]
    pub group: Option<String>,

    /// Only show archives in this tier (name or number)
    #[arg(short, long)]
    pub tier: Option<Tier>,

    /// Tier a new archive at this timestamp would get (requires --group)
    #[arg(short, long, value_parser = parse_timestamp, requires = "group")]
    pub at: Option<NaiveDateTime>,
}

/// Arguments for the tag command.
#[derive(Debug, Parser)]
pub struct TagArgs {
    /// Keys of the uploaded archives
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Bucket name (defaults to the configured archive bucket)
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Log the tags instead of writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Do not post metrics
    #[arg(long)]
    pub pretend: bool,
}

/// Arguments for the reconcile command.
#[derive(Debug, Parser)]
pub struct ReconcileArgs {
    /// Bucket name (defaults to the configured archive bucket)
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Log the tags instead of writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Do not post metrics
    #[arg(long)]
    pub pretend: bool,
}

/// Arguments for the handle command.
#[derive(Debug, Parser)]
pub struct HandleArgs {
    /// JSON file holding the event payload ("-" for stdin)
    #[arg(default_value = "-")]
    pub file: String,
}

/// Arguments for the watch command.
#[derive(Debug, Parser)]
pub struct WatchArgs {
    /// Minutes between reconciliations (overrides the configuration)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Stop after this many reconciliations
    #[arg(long)]
    pub cycles: Option<usize>,

    /// Log the tags instead of writing them
    #[arg(long)]
    pub dry_run: bool,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

/// Parse `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD HH:MM:SS`.
pub fn parse_timestamp(value: &str) -> std::result::Result<NaiveDateTime, String> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| format!("'{}' is not a timestamp (expected YYYY-MM-DDTHH:MM:SS)", value))
}
