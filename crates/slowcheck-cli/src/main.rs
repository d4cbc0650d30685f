//! slowcheck entry point.

use clap::Parser;
use slowcheck_cli::{Cli, Settings, exit_code_for, execute, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("slowcheck: cannot determine current directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = match Settings::resolve(&cli.global, &cwd) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("slowcheck: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::setup_logging(
        &settings.config.log.level,
        settings.config.log.file.as_deref(),
    ) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("slowcheck: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    match execute(&settings, &cli.command, &mut stdout) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("slowcheck: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
