//! Trace engine error type
//!
//! [`TraceError`] covers every failure inside grammar compilation, input
//! handling, filtering and correlation. `From<TraceError> for FollowmailError`
//! lets callers propagate with `?`, splitting configuration problems from
//! mid-scan failures.

use followmail_core::error::{ConfigError, FollowmailError, TraceFailure};

/// Trace engine domain error
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// Line grammar failed to compile or does not have six capture groups
    #[error("grammar error: {reason} (pattern: {pattern})")]
    Grammar {
        /// Offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// Filter or engine setting out of range
    #[error("config error: {field}: {reason}")]
    Config {
        /// Setting name
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Neither `to` nor `from` was configured
    #[error("config error: at least one of 'to' or 'from' must be set")]
    MissingFilter,

    /// Input file does not exist or is not a regular file
    #[error("input not found: {path}")]
    NotFound {
        /// Input path
        path: String,
    },

    /// Input exists but cannot be opened when the run is set up
    #[error("cannot read input {path}: {source}")]
    Unreadable {
        /// Input path
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Input could not be opened for a pass
    #[error("cannot open {input}: {source}")]
    Open {
        /// Input description
        input: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Input became unreadable partway through a pass
    #[error("read error: {input}:{line}: {source}")]
    Read {
        /// Input description
        input: String,
        /// 1-based number of the line being read
        line: usize,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl From<TraceError> for FollowmailError {
    fn from(err: TraceError) -> Self {
        match err {
            TraceError::Config { field, reason } => {
                FollowmailError::Config(ConfigError::InvalidValue { field, reason })
            }
            TraceError::MissingFilter => FollowmailError::Config(ConfigError::MissingFilter),
            TraceError::NotFound { path } => {
                FollowmailError::Config(ConfigError::FileNotFound { path })
            }
            TraceError::Unreadable { path, source } => {
                FollowmailError::Config(ConfigError::Unreadable {
                    path,
                    reason: source.to_string(),
                })
            }
            TraceError::Grammar { pattern, reason } => {
                FollowmailError::Trace(TraceFailure::Grammar(format!("{reason}: {pattern}")))
            }
            TraceError::Open { input, source } => {
                FollowmailError::Trace(TraceFailure::Source(format!("{input}: {source}")))
            }
            TraceError::Read {
                input,
                line,
                source,
            } => FollowmailError::Trace(TraceFailure::Read {
                input,
                line,
                reason: source.to_string(),
            }),
        }
    }
}
