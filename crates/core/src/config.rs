//! Configuration -- `followmail.toml` parsing and runtime settings
//!
//! [`FollowmailConfig`] carries the defaults the command line falls back to.
//!
//! # Precedence
//! 1. command-line flags (highest)
//! 2. environment variables (`FOLLOWMAIL_TRACE_QUEUE=postfix`)
//! 3. config file (`followmail.toml`)
//! 4. built-in defaults (`Default`)
//!
//! # Example
//! ```no_run
//! # fn example() -> Result<(), followmail_core::error::FollowmailError> {
//! use followmail_core::config::FollowmailConfig;
//!
//! let config = FollowmailConfig::load("followmail.toml")?;
//! let config = FollowmailConfig::parse("[trace]\nterminal_marker = \"removed\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, FollowmailError};

/// Default queue-prefix filter matched against the process field.
pub const DEFAULT_QUEUE: &str = "postfix";

/// Default terminal marker: the queue manager's removal notice.
pub const DEFAULT_TERMINAL_MARKER: &str = "removed";

/// Default correlation-key length range.
pub const DEFAULT_KEY_MIN_LEN: usize = 10;
pub const DEFAULT_KEY_MAX_LEN: usize = 15;

/// followmail configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FollowmailConfig {
    /// Logging settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Parsing and correlation settings
    #[serde(default)]
    pub trace: TraceConfig,
}

impl FollowmailConfig {
    /// Loads a TOML file, applies environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FollowmailError> {
        Self::load_or_default(Some(path.as_ref()))
    }

    /// Loads `path` when given, otherwise starts from defaults. Environment
    /// overrides apply in both cases; the merged result is validated.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, FollowmailError> {
        let config = Self::layered(path)?;
        config.validate()?;
        Ok(config)
    }

    /// File (or defaults) with environment overrides applied, not yet
    /// validated. Callers layering further overrides validate once at the end.
    pub fn layered(path: Option<&Path>) -> Result<Self, FollowmailError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads a TOML file without environment overrides or validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FollowmailError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FollowmailError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                FollowmailError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, FollowmailError> {
        toml::from_str(toml_str).map_err(|e| {
            FollowmailError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Overrides values from `FOLLOWMAIL_{SECTION}_{FIELD}` variables.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "FOLLOWMAIL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "FOLLOWMAIL_GENERAL_LOG_FORMAT");

        // Trace
        override_string(&mut self.trace.queue, "FOLLOWMAIL_TRACE_QUEUE");
        override_string(
            &mut self.trace.terminal_marker,
            "FOLLOWMAIL_TRACE_TERMINAL_MARKER",
        );
        override_string(&mut self.trace.grammar, "FOLLOWMAIL_TRACE_GRAMMAR");
        override_usize(&mut self.trace.key_min_len, "FOLLOWMAIL_TRACE_KEY_MIN_LEN");
        override_usize(&mut self.trace.key_max_len, "FOLLOWMAIL_TRACE_KEY_MAX_LEN");
        override_string(&mut self.trace.strategy, "FOLLOWMAIL_TRACE_STRATEGY");
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), FollowmailError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.trace.queue.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "trace.queue".to_owned(),
                reason: "queue filter must not be empty".to_owned(),
            }
            .into());
        }

        if self.trace.terminal_marker.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "trace.terminal_marker".to_owned(),
                reason: "terminal marker must not be empty".to_owned(),
            }
            .into());
        }

        if self.trace.key_min_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "trace.key_min_len".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        if self.trace.key_min_len > self.trace.key_max_len {
            return Err(ConfigError::InvalidValue {
                field: "trace.key_max_len".to_owned(),
                reason: format!(
                    "must not be smaller than key_min_len ({})",
                    self.trace.key_min_len
                ),
            }
            .into());
        }

        let valid_strategies = ["rescan", "buffered"];
        if !valid_strategies.contains(&self.trace.strategy.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "trace.strategy".to_owned(),
                reason: format!("must be one of: {}", valid_strategies.join(", ")),
            }
            .into());
        }

        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Parsing and correlation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Substring the process field must contain
    pub queue: String,
    /// Message substring that ends a correlation pass
    pub terminal_marker: String,
    /// Six-group line grammar; empty selects the canonical grammar
    pub grammar: String,
    /// Shortest accepted correlation key (canonical grammar only)
    pub key_min_len: usize,
    /// Longest accepted correlation key (canonical grammar only)
    pub key_max_len: usize,
    /// Correlation strategy (rescan, buffered)
    pub strategy: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_owned(),
            terminal_marker: DEFAULT_TERMINAL_MARKER.to_owned(),
            grammar: String::new(),
            key_min_len: DEFAULT_KEY_MIN_LEN,
            key_max_len: DEFAULT_KEY_MAX_LEN,
            strategy: "rescan".to_owned(),
        }
    }
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}
