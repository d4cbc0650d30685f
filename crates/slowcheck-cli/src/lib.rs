//! slowcheck command line host.
//!
//! Owns the cache directory and configuration, runs external programs as
//! units of work and maps regressions and program failures to exit codes.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod settings;

pub use cli::{Cli, Commands, GlobalArgs};
pub use settings::Settings;

use anyhow::Result;
use commands::ProgramFailed;
use std::io::Write;

/// Execute a parsed command, writing its report to `out`. Returns the exit
/// code: 0, or 1 when a batch had failures or regressions.
///
/// # Errors
///
/// Returns whatever the command fails with; see [`exit_code_for`] for how
/// errors map to exit codes.
pub fn execute(settings: &Settings, command: &Commands, out: &mut impl Write) -> Result<u8> {
    match command {
        Commands::Run { id, command } => {
            commands::run_command(settings, id.as_deref(), command, out)?;
        }
        Commands::Batch {
            plan,
            retain_unseen,
        } => {
            let items = commands::load_plan(plan)?;
            let summary = commands::run_batch(settings, &items, *retain_unseen, out)?;
            if !summary.is_success() {
                return Ok(1);
            }
        }
        Commands::Show { glob } => commands::show(&settings.cache(), glob, out)?,
        Commands::Durations { slowest, prefix } => {
            commands::durations(&settings.cache(), *slowest, prefix.as_deref(), out)?;
        }
        Commands::Clear => commands::clear(&settings.cache(), out)?,
        Commands::Config => commands::show_config(settings, out)?,
    }
    Ok(0)
}

/// Exit code for a failed command: the guarded program's own code when it
/// failed, 1 otherwise.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ProgramFailed>()
        .map_or(1, ProgramFailed::exit_code)
}
