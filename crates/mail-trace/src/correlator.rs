//! Queue-id correlation
//!
//! Given a seed record's queue id, a [`Correlator`] collects every record in
//! the input carrying the same id, in file order, and stops at the first of
//! them whose message contains the [`TerminalMarker`]. Without a terminal
//! record the pass runs to the end of the input.
//!
//! # Strategies
//! - [`RescanCorrelator`]: reopens the source for every id. Memory stays at
//!   one line plus the result; cost is one extra read of the input per seed.
//! - [`BufferedCorrelator`]: parses the input once into memory on first use
//!   and answers every id from that buffer. Same results, one read.

use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;

use tracing::debug;

use followmail_core::config::DEFAULT_TERMINAL_MARKER;
use followmail_core::types::LogRecord;

use crate::error::TraceError;
use crate::parser::LineGrammar;
use crate::source::{LogSource, for_each_line};

/// Message substring meaning the mail system is done with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalMarker(String);

impl TerminalMarker {
    /// Creates a marker. Empty markers are rejected since they would end
    /// every pass on its first record.
    pub fn new(marker: impl Into<String>) -> Result<Self, TraceError> {
        let marker = marker.into();
        if marker.is_empty() {
            return Err(TraceError::Config {
                field: "terminal_marker".to_owned(),
                reason: "terminal marker must not be empty".to_owned(),
            });
        }
        Ok(Self(marker))
    }

    /// Whether `record` ends its message's lifecycle.
    pub fn is_terminal(&self, record: &LogRecord) -> bool {
        record.message_contains(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TerminalMarker {
    fn default() -> Self {
        Self(DEFAULT_TERMINAL_MARKER.to_owned())
    }
}

/// Collects the records sharing one queue id.
pub trait Correlator {
    /// Returns every record with `key`, in input order, up to and including
    /// the first terminal record.
    fn correlate(&mut self, key: &str) -> Result<Vec<LogRecord>, TraceError>;
}

/// Selects the [`Correlator`] implementation used by a report run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorrelationStrategy {
    /// Reopen and rescan the input per queue id
    #[default]
    Rescan,
    /// Read the input once and correlate in memory
    Buffered,
}

impl FromStr for CorrelationStrategy {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rescan" => Ok(Self::Rescan),
            "buffered" => Ok(Self::Buffered),
            _ => Err(TraceError::Config {
                field: "strategy".to_owned(),
                reason: format!("unknown correlation strategy '{s}' (expected: rescan, buffered)"),
            }),
        }
    }
}

impl fmt::Display for CorrelationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rescan => write!(f, "rescan"),
            Self::Buffered => write!(f, "buffered"),
        }
    }
}

/// Correlator that re-reads the source for every queue id
pub struct RescanCorrelator<'a> {
    source: &'a dyn LogSource,
    grammar: &'a LineGrammar,
    marker: &'a TerminalMarker,
}

impl<'a> RescanCorrelator<'a> {
    pub fn new(
        source: &'a dyn LogSource,
        grammar: &'a LineGrammar,
        marker: &'a TerminalMarker,
    ) -> Self {
        Self {
            source,
            grammar,
            marker,
        }
    }
}

impl Correlator for RescanCorrelator<'_> {
    fn correlate(&mut self, key: &str) -> Result<Vec<LogRecord>, TraceError> {
        let mut records = Vec::new();
        let mut terminated = false;

        let lines = for_each_line(self.source, |line| {
            let Some(record) = self.grammar.parse(line) else {
                return Ok(ControlFlow::Continue(()));
            };
            if record.correlation_key != key {
                return Ok(ControlFlow::Continue(()));
            }

            let terminal = self.marker.is_terminal(&record);
            records.push(record);
            if terminal {
                terminated = true;
                Ok(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })?;

        debug!(
            key,
            lines,
            records = records.len(),
            terminated,
            "correlation pass finished"
        );
        Ok(records)
    }
}

/// Correlator that parses the source once and answers from memory
pub struct BufferedCorrelator<'a> {
    source: &'a dyn LogSource,
    grammar: &'a LineGrammar,
    marker: &'a TerminalMarker,
    records: Option<Vec<LogRecord>>,
}

impl<'a> BufferedCorrelator<'a> {
    pub fn new(
        source: &'a dyn LogSource,
        grammar: &'a LineGrammar,
        marker: &'a TerminalMarker,
    ) -> Self {
        Self {
            source,
            grammar,
            marker,
            records: None,
        }
    }

    fn load(&mut self) -> Result<&[LogRecord], TraceError> {
        if self.records.is_none() {
            let mut records = Vec::new();
            let grammar = self.grammar;
            let lines = for_each_line(self.source, |line| {
                if let Some(record) = grammar.parse(line) {
                    records.push(record);
                }
                Ok(ControlFlow::Continue(()))
            })?;
            debug!(lines, records = records.len(), "buffered input for correlation");
            self.records = Some(records);
        }
        Ok(self.records.as_deref().unwrap_or_default())
    }
}

impl Correlator for BufferedCorrelator<'_> {
    fn correlate(&mut self, key: &str) -> Result<Vec<LogRecord>, TraceError> {
        let marker = self.marker;
        let buffered = self.load()?;

        let mut records = Vec::new();
        for record in buffered.iter().filter(|r| r.correlation_key == key) {
            records.push(record.clone());
            if marker.is_terminal(record) {
                break;
            }
        }

        debug!(key, records = records.len(), "buffered correlation finished");
        Ok(records)
    }
}
