//! Domain types shared by the trace engine and the command-line front end.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One mail-log line broken into its six grammar fields.
///
/// Records exist only for lines that matched the grammar. The date keeps the
/// month/day token exactly as logged; the year is never present in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Month and day token, e.g. `Jan  5`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    /// Originating server name
    pub host: String,
    /// Emitting service including its pid, e.g. `postfix/qmgr[812]`
    pub process: String,
    /// Mail system queue identifier
    pub correlation_key: String,
    /// Free-form remainder of the line
    pub message: String,
}

impl LogRecord {
    /// Returns `true` when the message carries `needle` verbatim.
    pub fn message_contains(&self, needle: &str) -> bool {
        self.message.contains(needle)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}: {}: {}",
            self.date, self.time, self.host, self.process, self.correlation_key, self.message,
        )
    }
}

/// Field the final report is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Queue identifier (default)
    #[default]
    CorrelationKey,
    /// Month/day token, compared lexically
    Date,
    /// Emitting process
    Queue,
    /// Server name
    Host,
}

impl SortKey {
    /// Returns the field of `record` this key compares.
    pub fn extract<'a>(&self, record: &'a LogRecord) -> &'a str {
        match self {
            Self::CorrelationKey => &record.correlation_key,
            Self::Date => &record.date,
            Self::Queue => &record.process,
            Self::Host => &record.host,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorrelationKey => write!(f, "correlation-key"),
            Self::Date => write!(f, "date"),
            Self::Queue => write!(f, "queue"),
            Self::Host => write!(f, "host"),
        }
    }
}

impl FromStr for SortKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "correlation-key" | "correlation_key" | "id" => Ok(Self::CorrelationKey),
            "date" => Ok(Self::Date),
            "queue" => Ok(Self::Queue),
            "host" => Ok(Self::Host),
            _ => Err(ConfigError::InvalidValue {
                field: "sort_by".to_owned(),
                reason: format!("unknown sort key '{s}' (expected: id, date, queue, host)"),
            }),
        }
    }
}

/// Encoding of the emitted report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Padded text columns
    #[default]
    Table,
    /// Comma separated values with a header row
    Csv,
    /// Pretty-printed JSON array
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}
