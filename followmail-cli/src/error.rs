//! CLI-specific error types and exit code mapping

use std::backtrace::Backtrace;
use std::error::Error as _;
use std::fmt::Write as _;

use followmail_core::error::FollowmailError;
use followmail_trace::TraceError;

/// CLI-specific error type.
///
/// Every failure that reaches `main` ends up here so it can be reported as
/// one diagnostic line and mapped to an exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Domain error from configuration, filtering or scanning.
    #[error("{0}")]
    Core(#[from] FollowmailError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error writing the report.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl From<TraceError> for CliError {
    fn from(e: TraceError) -> Self {
        Self::Core(e.into())
    }
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | Scan failure or internal error        |
    /// | 2    | Configuration error                   |
    /// | 10   | IO error                              |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(FollowmailError::Config(_)) => 2,
            Self::Core(FollowmailError::Io(_)) | Self::Io(_) => 10,
            Self::Core(FollowmailError::Trace(_)) | Self::JsonSerialize(_) | Self::Logging(_) => 1,
        }
    }

    /// Short failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Core(e) => e.kind(),
            Self::JsonSerialize(_) => "output",
            Self::Io(_) => "io",
            Self::Logging(_) => "logging",
        }
    }

    /// One-line `<kind>: <location>: <description>` diagnostic.
    ///
    /// The location is left out when the error does not carry one.
    pub fn diagnostic(&self) -> String {
        let description = match self {
            Self::Core(e) => e.description(),
            Self::Io(e) => e.to_string(),
            Self::JsonSerialize(e) => e.to_string(),
            Self::Logging(reason) => reason.clone(),
        };
        let location = match self {
            Self::Core(e) => e.location(),
            _ => None,
        };

        match location {
            Some(location) => format!("{}: {}: {}", self.kind(), location, description),
            None => format!("{}: {}", self.kind(), description),
        }
    }

    /// Full error chain followed by a backtrace of the reporting site.
    pub fn traceback(&self) -> String {
        let mut out = String::from("error chain:\n");
        let _ = writeln!(out, "  0: {self}");
        let mut source = self.source();
        let mut depth = 1;
        while let Some(err) = source {
            let _ = writeln!(out, "  {depth}: {err}");
            source = err.source();
            depth += 1;
        }
        let _ = write!(out, "backtrace:\n{}", Backtrace::force_capture());
        out
    }
}
