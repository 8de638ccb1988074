//! Seed selection criteria
//!
//! [`FilterCriteria`] is built once from the command line (or any other
//! caller) and passed into the report run; nothing inside the engine reads
//! ambient configuration.
//!
//! # Example
//! ```
//! use followmail_trace::filter::FilterCriteriaBuilder;
//!
//! let criteria = FilterCriteriaBuilder::new()
//!     .to("bob@example.org")
//!     .max_lines(50)
//!     .build()
//!     .unwrap();
//! assert_eq!(criteria.queue(), "postfix");
//! ```

use regex::Regex;

use followmail_core::config::DEFAULT_QUEUE;
use followmail_core::types::{LogRecord, OutputFormat, SortKey};

use crate::error::TraceError;

const ADDRESS_PATTERN: &str = r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$";

/// Longest address accepted, in bytes.
const MAX_ADDRESS_LEN: usize = 254;

/// Envelope address syntax check (`local@domain.tld`)
#[derive(Debug, Clone)]
pub struct AddressSyntax {
    regex: Regex,
}

impl AddressSyntax {
    /// Compiles the address pattern.
    pub fn new() -> Result<Self, TraceError> {
        let regex = Regex::new(ADDRESS_PATTERN).map_err(|e| TraceError::Grammar {
            pattern: ADDRESS_PATTERN.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    pub fn is_valid(&self, address: &str) -> bool {
        address.len() <= MAX_ADDRESS_LEN && self.regex.is_match(address)
    }
}

/// Validated filter, sort and output settings for one report run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    to: Option<String>,
    from: Option<String>,
    queue: String,
    max_lines: Option<usize>,
    sort_by: SortKey,
    output: OutputFormat,
    to_needle: Option<String>,
    from_needle: Option<String>,
}

impl FilterCriteria {
    /// Recipient address filter
    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    /// Sender address filter
    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Substring the process field must contain
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Row cap applied after sorting
    pub fn max_lines(&self) -> Option<usize> {
        self.max_lines
    }

    pub fn sort_by(&self) -> SortKey {
        self.sort_by
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Whether `record` qualifies as a seed.
    ///
    /// The process must contain the queue filter, and the message must carry
    /// `to=<addr>` or `from=<addr>` exactly as the mail system logs it. With
    /// both addresses set, either one is enough.
    pub fn matches(&self, record: &LogRecord) -> bool {
        if !record.process.contains(&self.queue) {
            return false;
        }

        let to_hit = self
            .to_needle
            .as_deref()
            .is_some_and(|needle| record.message_contains(needle));
        let from_hit = self
            .from_needle
            .as_deref()
            .is_some_and(|needle| record.message_contains(needle));

        to_hit || from_hit
    }
}

/// Builder for [`FilterCriteria`]
#[derive(Debug, Clone)]
pub struct FilterCriteriaBuilder {
    to: Option<String>,
    from: Option<String>,
    queue: String,
    max_lines: Option<usize>,
    sort_by: SortKey,
    output: OutputFormat,
}

impl Default for FilterCriteriaBuilder {
    fn default() -> Self {
        Self {
            to: None,
            from: None,
            queue: DEFAULT_QUEUE.to_owned(),
            max_lines: None,
            sort_by: SortKey::default(),
            output: OutputFormat::default(),
        }
    }
}

impl FilterCriteriaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recipient address filter.
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to = Some(address.into());
        self
    }

    /// Sets the sender address filter.
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Sets the process substring filter.
    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Caps the number of emitted rows.
    pub fn max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = Some(max_lines);
        self
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort_by = key;
        self
    }

    pub fn output(mut self, format: OutputFormat) -> Self {
        self.output = format;
        self
    }

    /// Validates and builds the criteria.
    ///
    /// # Errors
    /// - neither `to` nor `from` set
    /// - an address failing the syntax check
    /// - `max_lines` of zero
    /// - an empty queue filter
    pub fn build(self) -> Result<FilterCriteria, TraceError> {
        if self.to.is_none() && self.from.is_none() {
            return Err(TraceError::MissingFilter);
        }

        let syntax = AddressSyntax::new()?;
        for (field, address) in [("to", &self.to), ("from", &self.from)] {
            match address {
                Some(address) if !syntax.is_valid(address) => {
                    return Err(TraceError::Config {
                        field: field.to_owned(),
                        reason: format!("'{address}' is not a valid email address"),
                    });
                }
                _ => {}
            }
        }

        if self.max_lines == Some(0) {
            return Err(TraceError::Config {
                field: "max_lines".to_owned(),
                reason: "must be a positive number".to_owned(),
            });
        }

        if self.queue.is_empty() {
            return Err(TraceError::Config {
                field: "queue".to_owned(),
                reason: "queue filter must not be empty".to_owned(),
            });
        }

        let to_needle = self.to.as_ref().map(|a| format!("to=<{a}>"));
        let from_needle = self.from.as_ref().map(|a| format!("from=<{a}>"));

        Ok(FilterCriteria {
            to: self.to,
            from: self.from,
            queue: self.queue,
            max_lines: self.max_lines,
            sort_by: self.sort_by,
            output: self.output,
            to_needle,
            from_needle,
        })
    }
}
