//! followmail command-line front end
//!
//! - [`cli`]: clap argument definitions
//! - [`commands`]: the trace run
//! - [`output`]: table, CSV and JSON rendering
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: diagnostics and exit codes

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

use cli::Cli;
use error::CliError;

/// Resolves configuration, starts logging and runs the trace, writing the
/// report to stdout.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let config = commands::trace::resolve_config(cli)?;

    logging::init_tracing(&config.general.log_level, &config.general.log_format)
        .map_err(|e| CliError::Logging(e.to_string()))?;

    tracing::info!(
        file = %cli.file.display(),
        config = ?cli.config,
        "followmail starting"
    );

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    commands::trace::execute(cli, &config, &mut handle)
}
