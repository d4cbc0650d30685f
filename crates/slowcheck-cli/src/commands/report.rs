//! Read-only views of the cache and configuration, plus `clear`.

use crate::settings::Settings;
use anyhow::Result;
use chrono::{DateTime, Local};
use serde_json::Value;
use slowcheck_core::FileCache;
use slowcheck_core::guard::{DURATION_PREFIX, sanitize_key};
use std::cmp::Ordering;
use std::io::Write;

const RULE_WIDTH: usize = 78;

/// One row of the durations table
#[derive(Debug, Clone, PartialEq)]
pub struct DurationRow {
    pub seconds: f64,
    pub last_run: Option<DateTime<Local>>,
    /// Raw identity for batched rows, sanitized cache key otherwise
    pub name: String,
    pub batched: bool,
}

/// Dump every cached value whose key matches `glob`.
///
/// # Errors
///
/// Returns an error if the glob is invalid, the cache cannot be read or the
/// output cannot be written.
pub fn show(cache: &FileCache, glob: &str, out: &mut impl Write) -> Result<()> {
    writeln!(out, "cachedir: {}", cache.dir().display())?;

    let entries = cache.entries(glob)?;
    if entries.is_empty() && cache.keys()?.is_empty() {
        writeln!(out, "cache is empty")?;
        return Ok(());
    }

    let title = format!(" cache values for '{glob}' ");
    let width = RULE_WIDTH;
    writeln!(out, "{title:-^width$}")?;
    for (key, value) in &entries {
        writeln!(out, "{key} contains:")?;
        for line in serde_json::to_string_pretty(value)?.lines() {
            writeln!(out, "  {line}")?;
        }
    }
    Ok(())
}

/// Collect recorded durations from per-identity entries and batched
/// mappings under `duration/`.
///
/// # Errors
///
/// Returns an error if the cache cannot be read.
pub fn collect_durations(cache: &FileCache) -> Result<Vec<DurationRow>> {
    let pattern = format!("{DURATION_PREFIX}*");
    let mut rows = Vec::new();

    for (key, value) in cache.entries(&pattern)? {
        let last_run = cache.modified(&key)?.map(DateTime::<Local>::from);
        match value {
            Value::Number(n) => {
                if let Some(seconds) = n.as_f64() {
                    rows.push(DurationRow {
                        seconds,
                        last_run,
                        name: key[DURATION_PREFIX.len()..].to_string(),
                        batched: false,
                    });
                }
            }
            Value::Object(mapping) => {
                rows.extend(mapping.into_iter().filter_map(|(identity, v)| {
                    v.as_f64().map(|seconds| DurationRow {
                        seconds,
                        last_run,
                        name: identity,
                        batched: true,
                    })
                }));
            }
            _ => {}
        }
    }

    Ok(rows)
}

/// Sort slowest first, filter by identity prefix and keep the `slowest`
/// first rows.
///
/// Per-identity rows are named by their sanitized key, so they also match
/// the sanitized prefix: `unit::` selects both `unit::a` from a batch and
/// `unit__b`.
#[must_use]
pub fn select_durations(
    mut rows: Vec<DurationRow>,
    slowest: Option<usize>,
    prefix: Option<&str>,
) -> Vec<DurationRow> {
    if let Some(prefix) = prefix {
        let sanitized = key_prefix(prefix);
        rows.retain(|row| {
            row.name.starts_with(prefix) || (!row.batched && row.name.starts_with(&sanitized))
        });
    }
    rows.sort_by(|a, b| {
        b.seconds
            .partial_cmp(&a.seconds)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    if let Some(n) = slowest {
        rows.truncate(n);
    }
    rows
}

/// `prefix` as it appears at the start of a sanitized key. Sanitizing marks
/// a trailing empty component, which a prefix must not carry.
fn key_prefix(prefix: &str) -> String {
    let mut sanitized = sanitize_key(prefix);
    if prefix.ends_with('/') {
        sanitized.pop();
    }
    sanitized
}

/// Print the durations table.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn render_durations(rows: &[DurationRow], out: &mut impl Write) -> Result<()> {
    writeln!(out, "{:>9}  {:<19}  name", "seconds", "last run")?;
    writeln!(out, "{:>9}  {:<19}  ----", "-------", "--------")?;
    for row in rows {
        let last_run = row.last_run.map_or_else(
            || "-".to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        writeln!(out, "{:>9.3}  {:<19}  {}", row.seconds, last_run, row.name)?;
    }
    Ok(())
}

/// `durations` command.
///
/// # Errors
///
/// Returns an error if the cache cannot be read or the output cannot be
/// written.
pub fn durations(
    cache: &FileCache,
    slowest: Option<usize>,
    prefix: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let rows = select_durations(collect_durations(cache)?, slowest, prefix);
    render_durations(&rows, out)
}

/// `clear` command.
///
/// # Errors
///
/// Returns an error if the cache directory cannot be removed.
pub fn clear(cache: &FileCache, out: &mut impl Write) -> Result<()> {
    cache.clear()?;
    writeln!(out, "cleared {}", cache.dir().display())?;
    Ok(())
}

/// `config` command: where settings came from and their effective values.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn show_config(settings: &Settings, out: &mut impl Write) -> Result<()> {
    let config = &settings.config;
    let found = if settings.config_file_found {
        ""
    } else {
        " (not found, using defaults)"
    };
    let zero_baseline = serde_json::to_value(config.guard.zero_baseline)?;
    let log_file = config
        .log
        .file
        .as_ref()
        .map_or_else(|| "-".to_string(), |p| p.display().to_string());

    writeln!(out, "config file    : {}{found}", settings.config_file.display())?;
    writeln!(out, "invocation dir : {}", settings.invocation_dir.display())?;
    writeln!(out, "cache dir      : {}", settings.cache_dir.display())?;
    writeln!(out, "factor         : {}", config.guard.factor)?;
    writeln!(
        out,
        "zero baseline  : {}",
        zero_baseline.as_str().unwrap_or_default()
    )?;
    writeln!(out, "batch key      : {}", config.batch.key)?;
    writeln!(out, "retain unseen  : {}", config.batch.retain_unseen)?;
    writeln!(out, "log level      : {}", config.log.level)?;
    writeln!(out, "log file       : {log_file}")?;
    Ok(())
}
