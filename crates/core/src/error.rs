//! Error types -- one enum per failure domain

/// followmail top-level error
#[derive(Debug, thiserror::Error)]
pub enum FollowmailError {
    /// Configuration or filter problem, detected before any scan
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Failure inside a scan or correlation pass
    #[error("trace error: {0}")]
    Trace(#[from] TraceFailure),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FollowmailError {
    /// Short failure kind used as the first field of a diagnostic line.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Trace(TraceFailure::Grammar(_)) => "grammar",
            Self::Trace(TraceFailure::Read { .. }) => "read",
            Self::Trace(TraceFailure::Source(_)) => "source",
            Self::Io(_) => "io",
        }
    }

    /// Where the failure happened, when the error knows.
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Config(ConfigError::FileNotFound { path })
            | Self::Config(ConfigError::Unreadable { path, .. }) => Some(path.clone()),
            Self::Config(ConfigError::InvalidValue { field, .. }) => Some(field.clone()),
            Self::Config(ConfigError::MissingFilter) => Some("filter".to_owned()),
            Self::Trace(TraceFailure::Read { input, line, .. }) => Some(format!("{input}:{line}")),
            _ => None,
        }
    }

    /// The failure text without the parts already reported by
    /// [`location`](Self::location).
    pub fn description(&self) -> String {
        match self {
            Self::Config(ConfigError::FileNotFound { .. }) => "file not found".to_owned(),
            Self::Config(ConfigError::InvalidValue { reason, .. })
            | Self::Config(ConfigError::Unreadable { reason, .. })
            | Self::Trace(TraceFailure::Read { reason, .. }) => reason.clone(),
            Self::Config(e) => e.to_string(),
            Self::Trace(e) => e.to_string(),
            Self::Io(e) => e.to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file (or input file) not found
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// TOML could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A value is out of its allowed range or syntax
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// A file exists but cannot be opened for reading
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// Neither a `to` nor a `from` address was given
    #[error("at least one of 'to' or 'from' must be set")]
    MissingFilter,
}

/// Failures raised while scanning or correlating
#[derive(Debug, thiserror::Error)]
pub enum TraceFailure {
    /// Line grammar could not be compiled or has the wrong shape
    #[error("invalid line grammar: {0}")]
    Grammar(String),

    /// Input became unreadable partway through a pass
    #[error("read failed at {input}:{line}: {reason}")]
    Read {
        input: String,
        line: usize,
        reason: String,
    },

    /// Input could not be opened
    #[error("cannot open input: {0}")]
    Source(String),
}
