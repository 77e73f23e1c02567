//! Clap derive structures for the `s3view` CLI.
//!
//! Defines the command tree, global flags, and shared value parsers.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use s3view_core::ObjectKey;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// s3view -- browse and follow an image catalog from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "s3view",
    version,
    about = "Browse and follow an s3view image catalog",
    long_about = "Command-line client for an s3view deployment.\n\n\
        Lists image summaries, hydrates image details, and follows the\n\
        backend's lifecycle notifications as they are reconciled locally.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "S3VIEW_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL including any base path (overrides profile)
    #[arg(long, short = 's', env = "S3VIEW_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "S3VIEW_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "S3VIEW_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "S3VIEW_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List image summaries, newest first
    #[command(alias = "ls")]
    List(ListArgs),

    /// Fetch and display the full detail of one image
    Show(ShowArgs),

    /// Show the groups, types and dynamic attributes available for filtering
    Filters,

    /// Show deployment metadata
    Info,

    /// Follow lifecycle notifications and print every reconciled change
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── list ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only images in this group
    #[arg(long, short = 'g')]
    pub group: Option<String>,

    /// Only images of this type (within --group)
    #[arg(long = "type", short = 't', requires = "group")]
    pub image_type: Option<String>,

    /// Case-insensitive substring match on name or key
    #[arg(long)]
    pub search: Option<String>,

    /// Dynamic attribute filter, repeatable
    #[arg(long = "filter", short = 'f', value_name = "ATTR=VALUE", value_parser = parse_attribute)]
    pub filters: Vec<(String, String)>,

    /// Only images modified at or after this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_time)]
    pub from: Option<DateTime<Utc>>,

    /// Only images modified at or before this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_time)]
    pub to: Option<DateTime<Utc>>,

    /// Maximum number of rows
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

// ── show ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Bucket holding the image
    pub bucket: String,

    /// Object key of the image
    pub key: String,
}

// ── watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Keep a detail view open for BUCKET/KEY, refreshed on dynamic input
    #[arg(long, value_name = "BUCKET/KEY")]
    pub open: Vec<ObjectKey>,
}

// ── config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the resolved configuration
    Show,

    /// Save --server (and --insecure) as a named profile
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Replace an existing profile of the same name
        #[arg(long)]
        force: bool,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ── completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

// ── Value parsers ────────────────────────────────────────────────────

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((attr, value)) if !attr.is_empty() => Ok((attr.to_owned(), value.to_owned())),
        _ => Err(format!("expected ATTR=VALUE, got '{raw}'")),
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 timestamp or YYYY-MM-DD, got '{raw}'"))
}
