//! Line grammar -- turns one raw mail-log line into a [`LogRecord`]
//!
//! The grammar is a regular expression with exactly six capture groups, in
//! order: date, time, host, process with pid, queue id, message.
//!
//! # Canonical format
//! ```text
//! Mar 14 09:26:53 mx1 postfix/qmgr[812]: 4BX2kS0Qz1z9: from=<alice@example.com>, size=1422
//! ```
//!
//! # Example
//! ```
//! use followmail_trace::parser::LineGrammar;
//!
//! let grammar = LineGrammar::canonical().unwrap();
//! let record = grammar
//!     .parse("Mar 14 09:26:53 mx1 postfix/qmgr[812]: 4BX2kS0Qz1z9: removed")
//!     .unwrap();
//! assert_eq!(record.correlation_key, "4BX2kS0Qz1z9");
//! ```

use regex::Regex;

use followmail_core::config::{DEFAULT_KEY_MAX_LEN, DEFAULT_KEY_MIN_LEN};
use followmail_core::types::LogRecord;

use crate::error::TraceError;

/// Capture groups a grammar must define.
pub const GRAMMAR_GROUPS: usize = 6;

/// Compiled six-group line grammar
///
/// Lines that do not match produce no record; that is routine, not an error.
/// A match must start at the first byte of the line, even when a caller's
/// pattern omits the leading `^`.
#[derive(Debug, Clone)]
pub struct LineGrammar {
    regex: Regex,
}

impl LineGrammar {
    /// Compiles a caller-supplied grammar.
    pub fn new(pattern: &str) -> Result<Self, TraceError> {
        let regex = Regex::new(pattern).map_err(|e| TraceError::Grammar {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;

        // captures_len() counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups != GRAMMAR_GROUPS {
            return Err(TraceError::Grammar {
                pattern: pattern.to_owned(),
                reason: format!("expected {GRAMMAR_GROUPS} capture groups, found {groups}"),
            });
        }

        Ok(Self { regex })
    }

    /// Canonical syslog grammar with the default 10-15 character queue id.
    pub fn canonical() -> Result<Self, TraceError> {
        Self::with_key_length(DEFAULT_KEY_MIN_LEN, DEFAULT_KEY_MAX_LEN)
    }

    /// Canonical syslog grammar with a custom queue id length range.
    pub fn with_key_length(min: usize, max: usize) -> Result<Self, TraceError> {
        if min == 0 || min > max {
            return Err(TraceError::Config {
                field: "key_length".to_owned(),
                reason: format!("invalid queue id length range {min}..={max}"),
            });
        }
        Self::new(&canonical_pattern(min, max))
    }

    /// Regular expression source of this grammar.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Parses one line. Trailing `\r`/`\n` are ignored.
    pub fn parse(&self, line: &str) -> Option<LogRecord> {
        let line = line.trim_end_matches(['\r', '\n']);
        let caps = self.regex.captures(line)?;

        if caps.get(0)?.start() != 0 {
            return None;
        }

        let field = |idx: usize| caps.get(idx).map(|m| m.as_str().to_owned());

        Some(LogRecord {
            date: field(1)?,
            time: field(2)?,
            host: field(3)?,
            process: field(4)?,
            correlation_key: field(5)?,
            message: field(6)?,
        })
    }
}

/// Source of the canonical grammar for a queue id length range.
pub fn canonical_pattern(min: usize, max: usize) -> String {
    format!(
        r"^(\w{{3}}\s+\d{{1,2}})\s+(\d{{2}}:\d{{2}}:\d{{2}})\s+(\S+)\s+([^\s/]+(?:/[^\s/\[]+)+\[\d+\]):\s+(\w{{{min},{max}}}):\s+(.*)$"
    )
}
