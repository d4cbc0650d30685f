use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Build the log filter. `RUST_LOG` wins; otherwise a bare level such as
/// `debug` applies to slowcheck's own targets and anything else is used as a
/// filter directive as-is.
#[must_use]
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive_for(level)))
}

fn directive_for(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("slowcheck={level}")
    }
}

/// Set up logging to stderr and optionally to `file`.
///
/// The returned guard flushes the file writer; keep it alive until exit.
///
/// # Errors
///
/// Returns an error if the log file's directory cannot be created.
pub fn setup_logging(level: &str, file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(level);

    fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        fmt::layer().with_writer(std::io::stderr).with_target(true)
    }

    let Some(file) = file else {
        tracing_subscriber::registry()
            .with(stderr_layer())
            .with(filter)
            .init();
        return Ok(None);
    };

    let dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let file_name = file
        .file_name()
        .map_or_else(|| "slowcheck.log".into(), std::ffi::OsStr::to_os_string);

    let file_appender = tracing_appender::rolling::never(&dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer())
        .with(filter)
        .init();

    Ok(Some(guard))
}
