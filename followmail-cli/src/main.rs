use clap::Parser;

use followmail_cli::cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = followmail_cli::run(&cli) {
        eprintln!("{}", err.diagnostic());
        if cli.traceback {
            eprintln!("{}", err.traceback());
        }
        std::process::exit(err.exit_code());
    }
}
