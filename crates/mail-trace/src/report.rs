//! Report building -- main scan, correlation per seed, sort and truncate
//!
//! ```text
//! Idle -> Scanning -> (per seed: Correlating -> Accumulating) -> Sorting -> Truncating -> Done
//! ```
//!
//! The main pass streams the input once. Each record that passes the
//! [`FilterCriteria`] and whose queue id has not been traced yet triggers a
//! correlation pass; the correlated records are appended in the order the
//! correlator returns them. Once the scan ends, the rows are sorted by the
//! configured key (stable) and cut to `max_lines` from the front.

use std::collections::HashSet;
use std::ops::{ControlFlow, Deref};

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use tracing::{debug, info};

use followmail_core::types::{LogRecord, SortKey};

use crate::correlator::{
    BufferedCorrelator, CorrelationStrategy, Correlator, RescanCorrelator, TerminalMarker,
};
use crate::error::TraceError;
use crate::filter::FilterCriteria;
use crate::parser::LineGrammar;
use crate::source::{LogSource, for_each_line};

/// Column names of a report row, in output order.
pub const COLUMNS: [&str; 6] = ["date", "time", "host", "queue", "correlation_key", "message"];

/// A correlated record accepted into the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow(LogRecord);

impl ReportRow {
    /// Field values in [`COLUMNS`] order.
    pub fn fields(&self) -> [&str; 6] {
        [
            &self.0.date,
            &self.0.time,
            &self.0.host,
            &self.0.process,
            &self.0.correlation_key,
            &self.0.message,
        ]
    }
}

impl From<LogRecord> for ReportRow {
    fn from(record: LogRecord) -> Self {
        Self(record)
    }
}

impl Deref for ReportRow {
    type Target = LogRecord;

    fn deref(&self) -> &LogRecord {
        &self.0
    }
}

impl Serialize for ReportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ReportRow", COLUMNS.len())?;
        for (name, value) in COLUMNS.iter().zip(self.fields()) {
            state.serialize_field(*name, value)?;
        }
        state.end()
    }
}

/// Counters gathered during one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Lines read by the main pass
    pub lines_read: usize,
    /// Main-pass lines that did not match the grammar
    pub lines_skipped: usize,
    /// Records that passed the filter
    pub matched: usize,
    /// Distinct queue ids traced
    pub seeds: usize,
    /// Rows collected before truncation
    pub rows_collected: usize,
}

/// Final, sorted and truncated report
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub stats: ScanStats,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Drives one report run over a source
///
/// # Example
/// ```
/// use followmail_trace::filter::FilterCriteriaBuilder;
/// use followmail_trace::parser::LineGrammar;
/// use followmail_trace::report::ReportBuilder;
/// use followmail_trace::source::MemorySource;
///
/// let source = MemorySource::new("mail.log", "\
/// Mar 14 09:26:55 mx1 postfix/smtp[2205]: 4BX2kS0Qz1z9: to=<bob@example.org>, status=sent
/// Mar 14 09:26:55 mx1 postfix/qmgr[812]: 4BX2kS0Qz1z9: removed
/// ");
/// let grammar = LineGrammar::canonical().unwrap();
/// let criteria = FilterCriteriaBuilder::new().to("bob@example.org").build().unwrap();
///
/// let report = ReportBuilder::new(&source, &grammar).build(&criteria).unwrap();
/// assert_eq!(report.len(), 2);
/// ```
pub struct ReportBuilder<'a> {
    source: &'a dyn LogSource,
    grammar: &'a LineGrammar,
    marker: TerminalMarker,
    strategy: CorrelationStrategy,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(source: &'a dyn LogSource, grammar: &'a LineGrammar) -> Self {
        Self {
            source,
            grammar,
            marker: TerminalMarker::default(),
            strategy: CorrelationStrategy::default(),
        }
    }

    /// Sets the substring that ends a correlation pass.
    pub fn terminal_marker(mut self, marker: TerminalMarker) -> Self {
        self.marker = marker;
        self
    }

    /// Selects rescan or buffered correlation.
    pub fn strategy(mut self, strategy: CorrelationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Runs the scan and returns the finished report.
    ///
    /// Any read failure aborts the run; no partial report is returned.
    pub fn build(&self, criteria: &FilterCriteria) -> Result<Report, TraceError> {
        let mut correlator: Box<dyn Correlator + '_> = match self.strategy {
            CorrelationStrategy::Rescan => Box::new(RescanCorrelator::new(
                self.source,
                self.grammar,
                &self.marker,
            )),
            CorrelationStrategy::Buffered => Box::new(BufferedCorrelator::new(
                self.source,
                self.grammar,
                &self.marker,
            )),
        };

        info!(
            input = %self.source.describe(),
            strategy = %self.strategy,
            to = criteria.to().unwrap_or("-"),
            from = criteria.from().unwrap_or("-"),
            queue = criteria.queue(),
            "scanning mail log"
        );

        let mut rows: Vec<ReportRow> = Vec::new();
        let mut traced: HashSet<String> = HashSet::new();
        let mut stats = ScanStats::default();

        let lines_read = for_each_line(self.source, |line| {
            let Some(record) = self.grammar.parse(line) else {
                stats.lines_skipped += 1;
                return Ok(ControlFlow::Continue(()));
            };
            if !criteria.matches(&record) {
                return Ok(ControlFlow::Continue(()));
            }
            stats.matched += 1;

            if !traced.insert(record.correlation_key.clone()) {
                return Ok(ControlFlow::Continue(()));
            }
            stats.seeds += 1;

            debug!(key = %record.correlation_key, "seed record found");
            let correlated = correlator.correlate(&record.correlation_key)?;
            rows.extend(correlated.into_iter().map(ReportRow::from));
            Ok(ControlFlow::Continue(()))
        })?;

        stats.lines_read = lines_read;
        stats.rows_collected = rows.len();

        sort_rows(&mut rows, criteria.sort_by());
        if let Some(max_lines) = criteria.max_lines() {
            truncate_rows(&mut rows, max_lines);
        }

        debug!(
            lines_read = stats.lines_read,
            lines_skipped = stats.lines_skipped,
            matched = stats.matched,
            seeds = stats.seeds,
            rows_collected = stats.rows_collected,
            rows = rows.len(),
            "scan finished"
        );

        Ok(Report { rows, stats })
    }
}

/// Stable sort by the lexical order of `key`'s field.
pub fn sort_rows(rows: &mut [ReportRow], key: SortKey) {
    rows.sort_by(|a, b| key.extract(a).cmp(key.extract(b)));
}

/// Keeps the first `max_lines` rows.
pub fn truncate_rows(rows: &mut Vec<ReportRow>, max_lines: usize) {
    rows.truncate(max_lines);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterCriteriaBuilder;
    use crate::source::MemorySource;

    const LOG: &str = "\
Mar 14 09:26:52 mx1 postfix/smtpd[2201]: connect from client.example.net[10.0.0.7]
Mar 14 09:26:53 mx1 postfix/qmgr[812]: 4BX2kS0Qz1z9: from=<alice@example.com>, size=1422, nrcpt=1 (queue active)
Mar 14 09:26:54 mx2 postfix/qmgr[913]: 1AAAAAAAAAAA: from=<carol@example.com>, size=900, nrcpt=1 (queue active)
Mar 14 09:26:55 mx1 postfix/smtp[2205]: 4BX2kS0Qz1z9: to=<bob@example.org>, relay=mx.example.org[192.0.2.5]:25, status=sent (250 OK)
Mar 14 09:26:55 mx1 postfix/qmgr[812]: 4BX2kS0Qz1z9: removed
Mar 13 23:59:59 mx2 postfix/smtp[3001]: 1AAAAAAAAAAA: to=<bob@example.org>, status=deferred
Mar 14 09:27:10 mx2 postfix/smtp[3001]: 1AAAAAAAAAAA: to=<bob@example.org>, status=sent (250 OK)
Mar 14 09:27:10 mx2 postfix/qmgr[913]: 1AAAAAAAAAAA: removed
this line is noise
";

    fn build(criteria: &FilterCriteria) -> Report {
        let source = MemorySource::new("mem", LOG);
        let grammar = LineGrammar::canonical().unwrap();
        ReportBuilder::new(&source, &grammar).build(criteria).unwrap()
    }

    fn to_bob() -> FilterCriteriaBuilder {
        FilterCriteriaBuilder::new().to("bob@example.org")
    }

    #[test]
    fn each_queue_id_is_traced_once() {
        let report = build(&to_bob().build().unwrap());
        // 1AAAAAAAAAAA matches twice but is correlated a single time
        assert_eq!(report.stats.matched, 3);
        assert_eq!(report.stats.seeds, 2);
        assert_eq!(report.len(), 7);
    }

    #[test]
    fn default_sort_groups_threads_by_queue_id() {
        let report = build(&to_bob().build().unwrap());
        let keys: Vec<_> = report.rows.iter().map(|r| r.correlation_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "1AAAAAAAAAAA",
                "1AAAAAAAAAAA",
                "1AAAAAAAAAAA",
                "1AAAAAAAAAAA",
                "4BX2kS0Qz1z9",
                "4BX2kS0Qz1z9",
                "4BX2kS0Qz1z9",
            ]
        );
        // stable: file order kept inside a thread
        assert!(report.rows[0].message.contains("carol@example.com"));
        assert_eq!(report.rows[3].message, "removed");
    }

    #[test]
    fn sort_by_date_is_lexical() {
        let report = build(&to_bob().sort_by(SortKey::Date).build().unwrap());
        assert_eq!(report.rows[0].date, "Mar 13");
    }

    #[test]
    fn sort_by_host_and_queue() {
        let report = build(&to_bob().sort_by(SortKey::Host).build().unwrap());
        assert_eq!(report.rows[0].host, "mx1");
        assert_eq!(report.rows.last().unwrap().host, "mx2");

        let report = build(&to_bob().sort_by(SortKey::Queue).build().unwrap());
        assert_eq!(report.rows[0].process, "postfix/qmgr[812]");
    }

    #[test]
    fn truncation_keeps_front_of_sorted_rows() {
        let report = build(&to_bob().max_lines(2).build().unwrap());
        assert_eq!(report.len(), 2);
        assert_eq!(report.stats.rows_collected, 7);
        assert!(report.rows.iter().all(|r| r.correlation_key == "1AAAAAAAAAAA"));
    }

    #[test]
    fn max_lines_above_row_count_keeps_everything() {
        let report = build(&to_bob().max_lines(100).build().unwrap());
        assert_eq!(report.len(), 7);
    }

    #[test]
    fn no_match_yields_empty_report() {
        let report = build(
            &FilterCriteriaBuilder::new()
                .to("nobody@example.net")
                .build()
                .unwrap(),
        );
        assert!(report.is_empty());
        assert_eq!(report.stats.seeds, 0);
    }

    #[test]
    fn skipped_lines_are_counted() {
        let report = build(&to_bob().build().unwrap());
        assert_eq!(report.stats.lines_read, 9);
        // "connect from" line and the noise line
        assert_eq!(report.stats.lines_skipped, 2);
    }

    #[test]
    fn buffered_strategy_gives_identical_report() {
        let source = MemorySource::new("mem", LOG);
        let grammar = LineGrammar::canonical().unwrap();
        let criteria = to_bob().from("alice@example.com").build().unwrap();
        let rescan = ReportBuilder::new(&source, &grammar).build(&criteria).unwrap();
        let buffered = ReportBuilder::new(&source, &grammar)
            .strategy(CorrelationStrategy::Buffered)
            .build(&criteria)
            .unwrap();
        assert_eq!(rescan.rows, buffered.rows);
    }

    #[test]
    fn row_serializes_with_column_names() {
        let report = build(&to_bob().max_lines(1).build().unwrap());
        let json = serde_json::to_value(&report.rows[0]).unwrap();
        assert_eq!(json["queue"], "postfix/qmgr[913]");
        assert_eq!(json["correlation_key"], "1AAAAAAAAAAA");
        assert_eq!(json.as_object().unwrap().len(), COLUMNS.len());
    }

    #[test]
    fn sorting_twice_changes_nothing() {
        let mut rows = build(&to_bob().build().unwrap()).rows;
        for key in [SortKey::Date, SortKey::Host, SortKey::Queue, SortKey::CorrelationKey] {
            sort_rows(&mut rows, key);
            let once = rows.clone();
            sort_rows(&mut rows, key);
            assert_eq!(rows, once);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn row(key: String, host: String) -> ReportRow {
            ReportRow::from(LogRecord {
                date: "Mar 14".to_owned(),
                time: "00:00:00".to_owned(),
                host,
                process: "postfix/qmgr[1]".to_owned(),
                correlation_key: key,
                message: String::new(),
            })
        }

        proptest! {
            #[test]
            fn sort_is_ordered_and_idempotent(
                entries in prop::collection::vec(("[A-F]{10}", "mx[0-3]"), 0..40)
            ) {
                let mut rows: Vec<_> = entries.into_iter().map(|(k, h)| row(k, h)).collect();
                sort_rows(&mut rows, SortKey::CorrelationKey);
                prop_assert!(rows.windows(2).all(|w| w[0].correlation_key <= w[1].correlation_key));
                let once = rows.clone();
                sort_rows(&mut rows, SortKey::CorrelationKey);
                prop_assert_eq!(rows, once);
            }

            #[test]
            fn truncate_keeps_min_of_cap_and_len(len in 0usize..50, cap in 1usize..60) {
                let mut rows: Vec<_> = (0..len)
                    .map(|i| row(format!("{i:012}"), "mx1".to_owned()))
                    .collect();
                let front: Vec<_> = rows.iter().take(cap).cloned().collect();
                truncate_rows(&mut rows, cap);
                prop_assert_eq!(rows.len(), len.min(cap));
                prop_assert_eq!(rows, front);
            }
        }
    }
}
