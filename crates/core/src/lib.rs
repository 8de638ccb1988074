//! followmail core -- shared domain types, error taxonomy and configuration.
//!
//! # Modules
//!
//! - [`types`]: parsed log records, sort keys and output formats
//! - [`error`]: top-level error type and configuration errors
//! - [`config`]: `followmail.toml` loading with environment overrides

pub mod config;
pub mod error;
pub mod types;

// --- re-exports ---

// errors
pub use error::{ConfigError, FollowmailError, TraceFailure};

// configuration
pub use config::{FollowmailConfig, GeneralConfig, TraceConfig};

// domain types
pub use types::{LogRecord, OutputFormat, SortKey};
