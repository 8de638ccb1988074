//! End-to-end report runs over files on disk

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

use followmail_core::error::{ConfigError, FollowmailError};
use followmail_core::types::SortKey;
use followmail_trace::{
    CorrelationStrategy, FileSource, FilterCriteriaBuilder, LineGrammar, Report, ReportBuilder,
    TerminalMarker, TraceError,
};

const SINGLE_MESSAGE: &str = "\
Mar 14 09:26:53 mx1 postfix/qmgr[812]: 4BX2kS0Qz1z9: from=<alice@example.com>, size=1422, nrcpt=1 (queue active)
Mar 14 09:26:55 mx1 postfix/qmgr[812]: 4BX2kS0Qz1z9: removed
";

const INTERLEAVED: &str = "\
Mar 14 10:00:00 mx1 postfix/qmgr[812]: BBBBBBBBBBBB: from=<alice@example.com>, size=10, nrcpt=1 (queue active)
Mar 14 10:00:01 mx1 postfix/qmgr[812]: AAAAAAAAAAAA: from=<alice@example.com>, size=20, nrcpt=1 (queue active)
Mar 14 10:00:02 mx1 postfix/smtp[901]: BBBBBBBBBBBB: to=<bob@example.org>, status=sent (250 OK)
Mar 14 10:00:03 mx1 postfix/smtp[902]: AAAAAAAAAAAA: to=<carol@example.org>, status=sent (250 OK)
Mar 14 10:00:04 mx1 postfix/qmgr[812]: BBBBBBBBBBBB: removed
Mar 14 10:00:05 mx1 postfix/qmgr[812]: AAAAAAAAAAAA: removed
";

fn write_log(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write log");
    path
}

fn write_gz_log(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content.as_bytes()).expect("compress");
    std::fs::write(&path, encoder.finish().expect("finish gz")).expect("write gz");
    path
}

fn run(path: &Path, builder: FilterCriteriaBuilder) -> Report {
    let source = FileSource::new(path).expect("source");
    let grammar = LineGrammar::canonical().expect("grammar");
    let criteria = builder.build().expect("criteria");
    ReportBuilder::new(&source, &grammar)
        .build(&criteria)
        .expect("report")
}

fn messages(report: &Report) -> Vec<&str> {
    report.rows.iter().map(|r| r.message.as_str()).collect()
}

#[test]
fn sender_seed_returns_whole_thread_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "mail.log", SINGLE_MESSAGE);

    let report = run(&path, FilterCriteriaBuilder::new().from("alice@example.com"));

    assert_eq!(report.len(), 2);
    assert!(report.rows[0].message.starts_with("from=<alice@example.com>"));
    assert_eq!(report.rows[1].message, "removed");
}

#[test]
fn interleaved_threads_are_grouped_by_queue_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "mail.log", INTERLEAVED);

    let report = run(&path, FilterCriteriaBuilder::new().from("alice@example.com"));

    let keys: Vec<_> = report.rows.iter().map(|r| r.correlation_key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "AAAAAAAAAAAA",
            "AAAAAAAAAAAA",
            "AAAAAAAAAAAA",
            "BBBBBBBBBBBB",
            "BBBBBBBBBBBB",
            "BBBBBBBBBBBB",
        ]
    );
    assert_eq!(
        messages(&report)[..3],
        [
            "from=<alice@example.com>, size=20, nrcpt=1 (queue active)",
            "to=<carol@example.org>, status=sent (250 OK)",
            "removed",
        ]
    );
}

#[test]
fn max_lines_cuts_after_sorting() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "mail.log", SINGLE_MESSAGE);

    let report = run(
        &path,
        FilterCriteriaBuilder::new()
            .from("alice@example.com")
            .max_lines(1),
    );

    assert_eq!(report.len(), 1);
    assert!(report.rows[0].message.starts_with("from=<alice@example.com>"));
}

#[test]
fn missing_filter_is_a_config_error() {
    let err = FilterCriteriaBuilder::new().build().unwrap_err();
    assert!(matches!(err, TraceError::MissingFilter));

    let top: FollowmailError = err.into();
    assert!(matches!(top, FollowmailError::Config(ConfigError::MissingFilter)));
}

#[test]
fn missing_input_file_is_reported_before_scanning() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileSource::new(dir.path().join("absent.log")).unwrap_err();
    let top: FollowmailError = err.into();
    assert_eq!(top.kind(), "config");
}

#[test]
fn gzip_input_gives_same_report_as_plain() {
    let dir = tempfile::tempdir().unwrap();
    let plain = write_log(&dir, "mail.log", INTERLEAVED);
    let gz = write_gz_log(&dir, "mail.log.1.gz", INTERLEAVED);

    let builder = || FilterCriteriaBuilder::new().to("bob@example.org");
    assert_eq!(run(&plain, builder()).rows, run(&gz, builder()).rows);
}

#[test]
fn unparseable_lines_do_not_affect_results() {
    let dir = tempfile::tempdir().unwrap();
    let clean = write_log(&dir, "clean.log", INTERLEAVED);

    let mut noisy_content = String::from("garbage at the top\n\n");
    for line in INTERLEAVED.lines() {
        noisy_content.push_str(line);
        noisy_content.push_str("\n  indented continuation\n");
    }
    noisy_content.push_str("Mar 14 10:00:06 mx1 postfix/smtpd[77]: disconnect from x[10.0.0.1]");
    let noisy = write_log(&dir, "noisy.log", &noisy_content);

    let builder = || FilterCriteriaBuilder::new().from("alice@example.com");
    let clean_report = run(&clean, builder());
    let noisy_report = run(&noisy, builder());

    assert_eq!(clean_report.rows, noisy_report.rows);
    assert!(noisy_report.stats.lines_skipped > clean_report.stats.lines_skipped);
}

#[test]
fn crlf_line_endings_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "mail.log", &SINGLE_MESSAGE.replace('\n', "\r\n"));

    let report = run(&path, FilterCriteriaBuilder::new().from("alice@example.com"));
    assert_eq!(messages(&report)[1], "removed");
}

#[test]
fn every_sort_key_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "mail.log", INTERLEAVED);

    for key in [SortKey::CorrelationKey, SortKey::Date, SortKey::Queue, SortKey::Host] {
        let report = run(
            &path,
            FilterCriteriaBuilder::new()
                .from("alice@example.com")
                .sort_by(key),
        );
        let mut resorted = report.rows.clone();
        followmail_trace::report::sort_rows(&mut resorted, key);
        assert_eq!(report.rows, resorted, "sort by {key} not idempotent");
    }
}

#[test]
fn buffered_and_rescan_agree_on_file_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_gz_log(&dir, "mail.log.gz", INTERLEAVED);
    let source = FileSource::new(&path).unwrap();
    let grammar = LineGrammar::canonical().unwrap();
    let criteria = FilterCriteriaBuilder::new()
        .from("alice@example.com")
        .to("carol@example.org")
        .build()
        .unwrap();

    let rescan = ReportBuilder::new(&source, &grammar).build(&criteria).unwrap();
    let buffered = ReportBuilder::new(&source, &grammar)
        .strategy(CorrelationStrategy::Buffered)
        .build(&criteria)
        .unwrap();

    assert_eq!(rescan.rows, buffered.rows);
    assert_eq!(rescan.stats.seeds, 2);
}

#[test]
fn custom_terminal_marker_shortens_threads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "mail.log", INTERLEAVED);
    let source = FileSource::new(&path).unwrap();
    let grammar = LineGrammar::canonical().unwrap();
    let criteria = FilterCriteriaBuilder::new()
        .from("alice@example.com")
        .build()
        .unwrap();

    let report = ReportBuilder::new(&source, &grammar)
        .terminal_marker(TerminalMarker::new("status=sent").unwrap())
        .build(&criteria)
        .unwrap();

    assert_eq!(report.len(), 4);
    assert!(report.rows.iter().all(|r| r.message != "removed"));
}

#[test]
fn custom_grammar_parses_alternate_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        &dir,
        "mail.log",
        "2024-03-14 09:26:53 mx1 postfix/qmgr[812] 4BX2kS0Qz1z9 from=<alice@example.com>\n\
         2024-03-14 09:26:55 mx1 postfix/qmgr[812] 4BX2kS0Qz1z9 removed\n",
    );
    let source = FileSource::new(&path).unwrap();
    let grammar =
        LineGrammar::new(r"^(\S+) (\S+) (\S+) (\S+\[\d+\]) (\w{10,15}) (.*)$").unwrap();
    let criteria = FilterCriteriaBuilder::new()
        .from("alice@example.com")
        .build()
        .unwrap();

    let report = ReportBuilder::new(&source, &grammar).build(&criteria).unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report.rows[0].date, "2024-03-14");
}
