//! The `followmail` trace run

use std::io::Write;

use tracing::{debug, info};

use followmail_core::config::FollowmailConfig;
use followmail_trace::{
    CorrelationStrategy, FileSource, FilterCriteria, FilterCriteriaBuilder, LineGrammar,
    ReportBuilder, TerminalMarker,
};

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Effective configuration: file, then environment, then command-line flags.
/// Validation runs once, on the fully merged result.
pub fn resolve_config(cli: &Cli) -> Result<FollowmailConfig, CliError> {
    let mut config = FollowmailConfig::layered(cli.config.as_deref())?;

    if let Some(queue) = &cli.queue {
        config.trace.queue = queue.clone();
    }
    if let Some(marker) = &cli.terminal_marker {
        config.trace.terminal_marker = marker.clone();
    }
    if let Some(grammar) = &cli.grammar {
        config.trace.grammar = grammar.clone();
    }
    if cli.buffered {
        config.trace.strategy = CorrelationStrategy::Buffered.to_string();
    }
    config.general.log_level = cli.log_level(&config.general.log_level).to_owned();

    config.validate()?;
    Ok(config)
}

/// Filter criteria from the flags, with the queue default taken from config.
pub fn build_criteria(cli: &Cli, config: &FollowmailConfig) -> Result<FilterCriteria, CliError> {
    let mut builder = FilterCriteriaBuilder::new()
        .queue(config.trace.queue.clone())
        .sort_by(cli.sort_key())
        .output(cli.output_format());
    if let Some(to) = &cli.to {
        builder = builder.to(to.clone());
    }
    if let Some(from) = &cli.from {
        builder = builder.from(from.clone());
    }
    if let Some(max_lines) = cli.max_lines {
        builder = builder.max_lines(max_lines);
    }
    Ok(builder.build()?)
}

/// Line grammar from config; an empty pattern selects the canonical one.
pub fn build_grammar(config: &FollowmailConfig) -> Result<LineGrammar, CliError> {
    let grammar = if config.trace.grammar.is_empty() {
        LineGrammar::with_key_length(config.trace.key_min_len, config.trace.key_max_len)?
    } else {
        LineGrammar::new(&config.trace.grammar)?
    };
    Ok(grammar)
}

/// Execute a trace run, writing the finished report to `w`.
///
/// All settings are validated and the input is checked before scanning
/// starts.
pub fn execute(cli: &Cli, config: &FollowmailConfig, w: &mut dyn Write) -> Result<(), CliError> {
    let criteria = build_criteria(cli, config)?;
    let grammar = build_grammar(config)?;
    let marker = TerminalMarker::new(config.trace.terminal_marker.clone())?;
    let strategy: CorrelationStrategy = config.trace.strategy.parse()?;
    let source = FileSource::new(&cli.file)?;

    debug!(
        grammar = grammar.pattern(),
        marker = marker.as_str(),
        compressed = source.is_compressed(),
        "settings resolved"
    );

    let report = ReportBuilder::new(&source, &grammar)
        .terminal_marker(marker)
        .strategy(strategy)
        .build(&criteria)?;

    info!(
        rows = report.len(),
        seeds = report.stats.seeds,
        lines_read = report.stats.lines_read,
        "report ready"
    );

    OutputWriter::new(criteria.output()).render_to(w, report.rows.as_slice())
}
