//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O. Flags layer on top of the
//! config file and environment in [`crate::commands::trace::resolve_config`].

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use followmail_core::types::{OutputFormat, SortKey};

/// Follow messages through a postfix mail log.
///
/// Finds the log records whose `to=<...>` or `from=<...>` names the given
/// address, then prints every record sharing their queue id until the
/// message is removed from the queue.
#[derive(Parser, Debug)]
#[command(name = "followmail", version, about, long_about = None)]
#[command(group(
    ArgGroup::new("sort")
        .args(["sort_by_id", "sort_by_date", "sort_by_queue", "sort_by_host"])
))]
#[command(group(ArgGroup::new("format").args(["csv", "json"])))]
pub struct Cli {
    /// Mail log to read; `.gz` files are decompressed transparently.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Recipient address to follow.
    #[arg(long, value_name = "ADDRESS")]
    pub to: Option<String>,

    /// Sender address to follow.
    #[arg(long, value_name = "ADDRESS")]
    pub from: Option<String>,

    /// Only seed from records whose process contains this text.
    #[arg(long)]
    pub queue: Option<String>,

    /// Print at most this many rows.
    #[arg(long, value_name = "N")]
    pub max_lines: Option<usize>,

    /// Sort rows by queue id (default).
    #[arg(long)]
    pub sort_by_id: bool,

    /// Sort rows by date.
    #[arg(long)]
    pub sort_by_date: bool,

    /// Sort rows by process.
    #[arg(long)]
    pub sort_by_queue: bool,

    /// Sort rows by host.
    #[arg(long)]
    pub sort_by_host: bool,

    /// Print CSV instead of a table.
    #[arg(long)]
    pub csv: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Six-group regular expression replacing the canonical line grammar.
    #[arg(long, value_name = "REGEX")]
    pub grammar: Option<String>,

    /// Message text that ends a queue id's lifecycle.
    #[arg(long, value_name = "TEXT")]
    pub terminal_marker: Option<String>,

    /// Path to a followmail.toml configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Read the log once into memory instead of rescanning per queue id.
    #[arg(long)]
    pub buffered: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the error chain and a backtrace on failure.
    #[arg(long)]
    pub traceback: bool,
}

impl Cli {
    /// Sort key selected by the sort flags.
    pub fn sort_key(&self) -> SortKey {
        if self.sort_by_date {
            SortKey::Date
        } else if self.sort_by_queue {
            SortKey::Queue
        } else if self.sort_by_host {
            SortKey::Host
        } else {
            SortKey::CorrelationKey
        }
    }

    /// Output format selected by `--csv`/`--json`.
    pub fn output_format(&self) -> OutputFormat {
        if self.csv {
            OutputFormat::Csv
        } else if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }

    /// The noisier of `base` and the level requested with `-v`.
    pub fn log_level<'a>(&self, base: &'a str) -> &'a str {
        let requested = match self.verbose {
            0 => return base,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        if verbosity_rank(requested) > verbosity_rank(base) {
            requested
        } else {
            base
        }
    }
}

/// Position of a level from quietest to noisiest; unknown names rank lowest.
fn verbosity_rank(level: &str) -> usize {
    ["error", "warn", "info", "debug", "trace"]
        .iter()
        .position(|l| *l == level)
        .unwrap_or(0)
}
