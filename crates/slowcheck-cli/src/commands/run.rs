//! `run` and `batch`: external programs as guarded units of work.

use crate::settings::Settings;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use slowcheck_core::{
    DurationGuard, DurationSession, Error as CoreError, Outcome, RegressionExceeded, Verdict,
};
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// The guarded program ran but did not succeed.
#[derive(Debug, thiserror::Error)]
#[error("{program} exited with {status}")]
pub struct ProgramFailed {
    pub program: String,
    pub status: ExitStatus,
}

impl ProgramFailed {
    /// Exit code to hand back to the caller
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.status
            .code()
            .and_then(|c| u8::try_from(c).ok())
            .filter(|c| *c != 0)
            .unwrap_or(1)
    }
}

/// One entry of a batch plan
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlanItem {
    #[serde(default)]
    pub id: Option<String>,
    pub command: Vec<String>,
}

impl PlanItem {
    /// Identity to record under
    #[must_use]
    pub fn identity(&self) -> String {
        self.id.clone().unwrap_or_else(|| default_identity(&self.command))
    }
}

/// Per-item result of a batch
#[derive(Debug)]
pub enum ItemResult {
    Passed(Outcome),
    Regressed(RegressionExceeded),
    Failed { identity: String, error: String },
}

/// Totals of a batch run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub passed: usize,
    pub regressed: usize,
    pub failed: usize,
}

impl BatchSummary {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.regressed == 0 && self.failed == 0
    }
}

/// Identity for a command line without an explicit id
#[must_use]
pub fn default_identity(command: &[String]) -> String {
    command.join(" ")
}

/// Run `command` to completion, failing if it cannot start or exits
/// unsuccessfully.
///
/// # Errors
///
/// Returns an error if the command is empty or cannot be spawned, or
/// [`ProgramFailed`] if it exits with a failure status.
pub fn run_program(command: &[String]) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        bail!("No program given");
    };

    debug!("Running {}", default_identity(command));
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("Failed to start {program}"))?;

    if !status.success() {
        return Err(ProgramFailed {
            program: program.clone(),
            status,
        }
        .into());
    }
    Ok(())
}

/// Run `command` and return how long it took along with how it went.
fn measure(command: &[String]) -> (Duration, Result<()>) {
    let start = Instant::now();
    let result = run_program(command);
    (start.elapsed(), result)
}

/// Guard a single program run with a per-identity cache entry.
///
/// Prints the outcome to `out` on success. A program failure is returned
/// unchanged and nothing is recorded.
///
/// # Errors
///
/// Returns [`ProgramFailed`], a regression, or a cache error.
pub fn run_command(
    settings: &Settings,
    id: Option<&str>,
    command: &[String],
    out: &mut impl Write,
) -> Result<Outcome> {
    let identity = id.map_or_else(|| default_identity(command), str::to_string);
    let cache = settings.cache();
    let guard = DurationGuard::new(&cache, settings.policy());
    let key = guard.key_for(&identity)?;
    debug!("Guarding {identity} under {key}");

    let (elapsed, result) = measure(command);
    result?;
    let outcome = guard.record(&identity, elapsed)?;
    writeln!(out, "{}", format_outcome(&outcome))?;
    Ok(outcome)
}

/// Read a batch plan from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or an item has an
/// empty command.
pub fn load_plan(path: &Path) -> Result<Vec<PlanItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan {}", path.display()))?;
    let items: Vec<PlanItem> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse plan {}", path.display()))?;

    if let Some(pos) = items.iter().position(|item| item.command.is_empty()) {
        bail!("Plan item {pos} has an empty command");
    }
    Ok(items)
}

/// Run every plan item inside one batched session.
///
/// Failures and regressions are reported per item and do not stop the
/// batch. A failing program still has its duration recorded. The session is
/// written once at the end.
///
/// # Errors
///
/// Returns an error if the cache cannot be read or written, or the report
/// cannot be printed.
pub fn run_batch(
    settings: &Settings,
    items: &[PlanItem],
    retain_unseen: bool,
    out: &mut impl Write,
) -> Result<BatchSummary> {
    let cache = settings.cache();
    let mut session = DurationSession::open(&cache, &settings.config.batch.key, settings.policy())?
        .retain_unseen(retain_unseen || settings.config.batch.retain_unseen);

    let mut summary = BatchSummary::default();
    for item in items {
        let identity = item.identity();
        let (elapsed, ran) = measure(&item.command);
        let checked = session.record(&identity, elapsed);
        let result = match (ran, checked) {
            (Err(e), _) => ItemResult::Failed {
                identity,
                error: format!("{e:#}"),
            },
            (Ok(()), Ok(outcome)) => ItemResult::Passed(outcome),
            (Ok(()), Err(CoreError::Regression(regression))) => ItemResult::Regressed(regression),
            (Ok(()), Err(e)) => return Err(e.into()),
        };

        match &result {
            ItemResult::Passed(_) => summary.passed += 1,
            ItemResult::Regressed(_) => summary.regressed += 1,
            ItemResult::Failed { .. } => summary.failed += 1,
        }
        writeln!(out, "{}", format_item(&result))?;
    }

    session.finish()?;
    info!(
        "Batch finished: {} passed, {} regressed, {} failed",
        summary.passed, summary.regressed, summary.failed
    );
    writeln!(out, "{}", format_summary(&summary))?;
    Ok(summary)
}

/// One-line description of a passing check
#[must_use]
pub fn format_outcome(outcome: &Outcome) -> String {
    let detail = match (outcome.verdict, outcome.prior) {
        (Verdict::Within, Some(prior)) => format!("last {prior:.3}s"),
        (Verdict::SkippedZeroBaseline, _) => "last 0.000s, not compared".to_string(),
        _ => "new baseline".to_string(),
    };
    format!(
        "{} took {:.3}s ({detail})",
        outcome.identity, outcome.elapsed
    )
}

#[must_use]
pub fn format_item(result: &ItemResult) -> String {
    match result {
        ItemResult::Passed(outcome) => format!("PASS  {}", format_outcome(outcome)),
        ItemResult::Regressed(regression) => format!("SLOW  {regression}"),
        ItemResult::Failed { identity, error } => format!("FAIL  {identity}: {error}"),
    }
}

#[must_use]
pub fn format_summary(summary: &BatchSummary) -> String {
    format!(
        "{} passed, {} regressed, {} failed",
        summary.passed, summary.regressed, summary.failed
    )
}
