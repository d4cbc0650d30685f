//! CLI argument parsing for slowcheck.

use clap::{Args, Parser, Subcommand};
use slowcheck_core::ZeroBaseline;
use std::path::PathBuf;

/// slowcheck - fail a run when it gets more than twice as slow
#[derive(Parser, Debug)]
#[command(name = "slowcheck")]
#[command(version, about)]
#[command(after_help = "\
Examples:
  slowcheck run -- cargo test -q          Guard a command, identity = command line
  slowcheck run --id unit -- make check   Guard a command under an explicit identity
  slowcheck batch plan.json               Guard every item of a plan in one session
  slowcheck show 'duration/*'             Dump cached values matching a glob
  slowcheck durations -n 5                Five slowest recorded durations
  slowcheck clear                         Delete the cache directory
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options that override the config file
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Config file (defaults to ~/.config/slowcheck/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Cache directory (defaults to ./.slowcheck_cache)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Allowed slowdown factor before a run counts as a regression
    #[arg(long, global = true, value_name = "FACTOR")]
    pub factor: Option<f64>,

    /// How to treat a previous duration of zero seconds: skip or flag
    #[arg(long, global = true, value_name = "POLICY", value_parser = parse_zero_baseline)]
    pub zero_baseline: Option<ZeroBaseline>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a program and check its duration against the last run
    Run {
        /// Identity to record under (defaults to the command line)
        #[arg(long)]
        id: Option<String>,

        /// Program and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Run every item of a JSON plan in one session
    Batch {
        /// Plan file: [{"id": "...", "command": ["prog", "arg"]}, ...]
        plan: PathBuf,

        /// Keep durations of identities that are not part of this plan
        #[arg(long)]
        retain_unseen: bool,
    },

    /// Show cached values
    Show {
        /// Only keys matching this glob
        #[arg(default_value = "*")]
        glob: String,
    },

    /// List recorded durations, slowest first
    Durations {
        /// Only show the N slowest
        #[arg(short = 'n', long = "slowest", value_name = "N")]
        slowest: Option<usize>,

        /// Only identities starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Delete the cache directory
    Clear,

    /// Show the effective configuration
    Config,
}

/// Parse a zero baseline policy by the same names the config file uses.
fn parse_zero_baseline(value: &str) -> Result<ZeroBaseline, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unknown zero baseline policy '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zero_baseline_uses_config_names() {
        assert_eq!(parse_zero_baseline("skip"), Ok(ZeroBaseline::Skip));
        assert_eq!(parse_zero_baseline("flag"), Ok(ZeroBaseline::Flag));
        assert!(parse_zero_baseline("Flag").is_err());
        assert!(parse_zero_baseline("maybe").is_err());
    }
}
