//! Integration tests for the slowcheck command line host
//!
//! These drive parsed commands through `execute` with output captured in a
//! buffer, so no binary has to be spawned.

#![allow(clippy::float_cmp)] // Exact float comparisons are intentional in tests

use chrono::{Local, TimeZone};
use clap::Parser;
use slowcheck_cli::commands::{
    DurationRow, PlanItem, ProgramFailed, load_plan, render_durations, run_batch, show,
};
use slowcheck_cli::{Cli, Commands, GlobalArgs, Settings, execute, exit_code_for};
use slowcheck_core::{CacheStore, FileCache, ZeroBaseline};
use std::path::Path;
use tempfile::TempDir;

/// Settings rooted in a temp dir, ignoring any user config file
fn temp_settings() -> (TempDir, Settings) {
    let temp_dir = tempfile::tempdir().unwrap();
    let args = GlobalArgs {
        config: Some(temp_dir.path().join("config.json")),
        ..GlobalArgs::default()
    };
    let settings = Settings::resolve(&args, temp_dir.path()).unwrap();
    (temp_dir, settings)
}

fn output_of(settings: &Settings, argv: &[&str]) -> (anyhow::Result<u8>, String) {
    let cli = Cli::try_parse_from(argv).unwrap();
    let mut out = Vec::new();
    let result = execute(settings, &cli.command, &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

// Argument parsing

#[test]
fn test_parse_durations_short_flag() {
    let cli = Cli::try_parse_from(["slowcheck", "durations", "-n", "3"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Durations {
            slowest: Some(3),
            prefix: None
        }
    ));
}

#[test]
fn test_parse_durations_long_flag() {
    let cli = Cli::try_parse_from(["slowcheck", "durations", "--slowest", "7", "--prefix", "unit"])
        .unwrap();
    match cli.command {
        Commands::Durations { slowest, prefix } => {
            assert_eq!(slowest, Some(7));
            assert_eq!(prefix.as_deref(), Some("unit"));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_run_keeps_program_flags() {
    let cli = Cli::try_parse_from(["slowcheck", "run", "--id", "unit", "--", "cargo", "test", "-q"])
        .unwrap();
    match cli.command {
        Commands::Run { id, command } => {
            assert_eq!(id.as_deref(), Some("unit"));
            assert_eq!(command, words(&["cargo", "test", "-q"]));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_run_requires_a_program() {
    assert!(Cli::try_parse_from(["slowcheck", "run"]).is_err());
}

#[test]
fn test_parse_global_options_after_subcommand() {
    let cli = Cli::try_parse_from([
        "slowcheck",
        "show",
        "--factor",
        "3",
        "--zero-baseline",
        "flag",
        "--cache-dir",
        "/tmp/c",
    ])
    .unwrap();
    assert_eq!(cli.global.factor, Some(3.0));
    assert_eq!(cli.global.zero_baseline, Some(ZeroBaseline::Flag));
    assert_eq!(cli.global.cache_dir.as_deref(), Some(Path::new("/tmp/c")));
    assert!(matches!(cli.command, Commands::Show { ref glob } if glob == "*"));
}

#[test]
fn test_parse_rejects_unknown_zero_baseline() {
    assert!(Cli::try_parse_from(["slowcheck", "config", "--zero-baseline", "maybe"]).is_err());
}

// Reports

#[test]
fn test_durations_empty_cache() {
    let (_temp, settings) = temp_settings();

    let (result, output) = output_of(&settings, &["slowcheck", "durations"]);

    assert_eq!(result.unwrap(), 0);
    let expected = "  seconds  last run             name\n  -------  --------             ----\n";
    assert_eq!(output, expected);
}

#[test]
fn test_render_many_durations() {
    let t = Local.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap();
    let rows = vec![
        DurationRow {
            seconds: 12.5,
            last_run: Some(t),
            name: "integration::full".to_string(),
            batched: true,
        },
        DurationRow {
            seconds: 0.25,
            last_run: None,
            name: "unit::parse".to_string(),
            batched: true,
        },
    ];

    let mut out = Vec::new();
    render_durations(&rows, &mut out).unwrap();

    let expected = "  seconds  last run             name\n\
                    \x20 -------  --------             ----\n\
                    \x20  12.500  2024-05-17 09:30:00  integration::full\n\
                    \x20   0.250  -                    unit::parse\n";
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn test_durations_reads_both_layouts() {
    let (_temp, settings) = temp_settings();
    let cache = settings.cache();
    cache.set("duration/unit__fast", &0.5).unwrap();
    cache
        .set(
            "duration/testdurations",
            &serde_json::json!({"batch::slow": 3.0, "batch::mid": 1.0}),
        )
        .unwrap();

    let (result, output) = output_of(&settings, &["slowcheck", "durations", "-n", "2"]);
    assert_eq!(result.unwrap(), 0);

    let names: Vec<&str> = output
        .lines()
        .skip(2)
        .map(|line| line.rsplit("  ").next().unwrap())
        .collect();
    assert_eq!(names, vec!["batch::slow", "batch::mid"]);
}

#[test]
fn test_show_empty_cache() {
    let (_temp, settings) = temp_settings();
    let mut out = Vec::new();

    show(&settings.cache(), "*", &mut out).unwrap();

    let expected = format!("cachedir: {}\ncache is empty\n", settings.cache_dir.display());
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn test_show_values() {
    let (_temp, settings) = temp_settings();
    let cache = settings.cache();
    cache.set("duration/test_x", &0.3).unwrap();
    cache.set("other/flag", &true).unwrap();

    let (result, output) = output_of(&settings, &["slowcheck", "show", "duration/*"]);
    assert_eq!(result.unwrap(), 0);

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].contains(" cache values for 'duration/*' "));
    assert!(lines[1].starts_with("---") && lines[1].ends_with("---"));
    assert_eq!(lines[1].len(), 78);
    assert_eq!(lines[2], "duration/test_x contains:");
    assert_eq!(lines[3], "  0.3");
}

#[test]
fn test_clear_removes_cache_dir() {
    let (_temp, settings) = temp_settings();
    settings.cache().set("duration/x", &1.0).unwrap();
    assert!(settings.cache_dir.exists());

    let (result, output) = output_of(&settings, &["slowcheck", "clear"]);
    assert_eq!(result.unwrap(), 0);
    assert!(output.starts_with("cleared "));
    assert!(!settings.cache_dir.exists());
}

#[test]
fn test_config_report() {
    let (_temp, settings) = temp_settings();

    let (result, output) = output_of(&settings, &["slowcheck", "config"]);
    assert_eq!(result.unwrap(), 0);

    assert!(output.contains("(not found, using defaults)"));
    assert!(output.contains("factor         : 2\n"));
    assert!(output.contains("zero baseline  : skip\n"));
    assert!(output.contains("batch key      : duration/testdurations\n"));
    assert!(output.contains("log file       : -\n"));
    assert!(output.contains(&format!(
        "cache dir      : {}\n",
        settings.cache_dir.display()
    )));
}

// Plans

#[test]
fn test_load_plan() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("plan.json");
    std::fs::write(
        &path,
        r#"[{"id": "nap", "command": ["sleep", "0"]}, {"command": ["true"]}]"#,
    )
    .unwrap();

    let items = load_plan(&path).unwrap();
    assert_eq!(
        items,
        vec![
            PlanItem {
                id: Some("nap".to_string()),
                command: words(&["sleep", "0"]),
            },
            PlanItem {
                id: None,
                command: words(&["true"]),
            },
        ]
    );
}

#[test]
fn test_load_plan_rejects_empty_command() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("plan.json");
    std::fs::write(&path, r#"[{"id": "x", "command": []}]"#).unwrap();

    let err = load_plan(&path).unwrap_err();
    assert!(err.to_string().contains("empty command"));
}

#[test]
fn test_load_plan_missing_file() {
    let err = load_plan(Path::new("/nonexistent/plan.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read plan"));
}

// Running programs

#[cfg(unix)]
mod programs {
    use super::*;

    #[test]
    fn test_run_records_baseline() {
        let (_temp, settings) = temp_settings();

        let (result, output) = output_of(&settings, &["slowcheck", "run", "--id", "ok", "--", "true"]);

        assert_eq!(result.unwrap(), 0);
        assert!(output.starts_with("ok took "), "{output}");
        assert!(output.contains("(new baseline)"));
        let stored: Option<f64> = settings.cache().get("duration/ok", None).unwrap();
        assert!(stored.is_some());
    }

    #[test]
    fn test_run_default_identity_is_command_line() {
        let (_temp, settings) = temp_settings();

        let (result, _) = output_of(&settings, &["slowcheck", "run", "sh", "-c", "exit 0"]);

        assert_eq!(result.unwrap(), 0);
        assert_eq!(
            settings.cache().keys().unwrap(),
            vec!["duration/sh -c exit 0".to_string()]
        );
    }

    #[test]
    fn test_run_absolute_program_path() {
        let (_temp, settings) = temp_settings();

        let (result, output) = output_of(&settings, &["slowcheck", "run", "/bin/sh", "-c", "exit 0"]);

        assert_eq!(result.unwrap(), 0);
        assert!(output.starts_with("/bin/sh -c exit 0 took "), "{output}");
        assert_eq!(
            settings.cache().keys().unwrap(),
            vec!["duration/_/bin/sh -c exit 0".to_string()]
        );
    }

    #[test]
    fn test_batch_failed_item_keeps_its_entry() {
        let (_temp, settings) = temp_settings();
        let cache = settings.cache();
        cache
            .set("duration/testdurations", &serde_json::json!({"broken": 5.0}))
            .unwrap();

        let items = vec![PlanItem {
            id: Some("broken".to_string()),
            command: words(&["false"]),
        }];
        let summary = run_batch(&settings, &items, false, &mut Vec::new()).unwrap();
        assert_eq!(summary.failed, 1);

        let saved: std::collections::BTreeMap<String, f64> = cache
            .get("duration/testdurations", std::collections::BTreeMap::new())
            .unwrap();
        assert!(saved["broken"] < 5.0);
    }

    #[test]
    fn test_run_regression_persists_and_fails() {
        let (_temp, settings) = temp_settings();
        let cache = settings.cache();
        cache.set("duration/nap", &0.000_001).unwrap();

        let (result, _) =
            output_of(&settings, &["slowcheck", "run", "--id", "nap", "--", "sleep", "0.05"]);

        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("test duration over 2x last duration"),
            "{err:#}"
        );
        assert_eq!(exit_code_for(&err), 1);
        let stored: f64 = cache.get("duration/nap", 0.0).unwrap();
        assert!(stored >= 0.05);
    }

    #[test]
    fn test_run_program_failure_keeps_exit_code_and_skips_recording() {
        let (_temp, settings) = temp_settings();
        let cache = settings.cache();
        cache.set("duration/broken", &1.0).unwrap();

        let (result, output) = output_of(
            &settings,
            &["slowcheck", "run", "--id", "broken", "--", "sh", "-c", "exit 3"],
        );

        let err = result.unwrap_err();
        assert!(err.downcast_ref::<ProgramFailed>().is_some());
        assert_eq!(exit_code_for(&err), 3);
        assert!(output.is_empty());
        assert_eq!(cache.get("duration/broken", 0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_run_missing_program() {
        let (_temp, settings) = temp_settings();

        let (result, _) = output_of(
            &settings,
            &["slowcheck", "run", "--", "definitely-not-a-real-program-7f3a"],
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to start"));
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn test_batch_reports_each_item_and_flushes_once() {
        let (_temp, settings) = temp_settings();
        let cache = settings.cache();
        cache
            .set(
                "duration/testdurations",
                &serde_json::json!({"slow": 0.000_001, "gone": 1.0}),
            )
            .unwrap();

        let items = vec![
            PlanItem {
                id: Some("fast".to_string()),
                command: words(&["true"]),
            },
            PlanItem {
                id: Some("slow".to_string()),
                command: words(&["sleep", "0.05"]),
            },
            PlanItem {
                id: Some("broken".to_string()),
                command: words(&["false"]),
            },
        ];

        let mut out = Vec::new();
        let summary = run_batch(&settings, &items, false, &mut out).unwrap();
        let output = String::from_utf8(out).unwrap();

        assert_eq!((summary.passed, summary.regressed, summary.failed), (1, 1, 1));
        assert!(!summary.is_success());

        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("PASS  fast took "));
        assert!(lines[1].starts_with("SLOW  test duration over 2x last duration: slow took"));
        assert!(lines[2].starts_with("FAIL  broken: false exited with"));
        assert_eq!(lines[3], "1 passed, 1 regressed, 1 failed");

        let saved: std::collections::BTreeMap<String, f64> = cache
            .get("duration/testdurations", std::collections::BTreeMap::new())
            .unwrap();
        assert_eq!(
            saved.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["broken", "fast", "slow"]
        );
    }

    #[test]
    fn test_batch_retain_unseen_flag() {
        let (_temp, settings) = temp_settings();
        let cache = settings.cache();
        cache
            .set("duration/testdurations", &serde_json::json!({"gone": 1.0}))
            .unwrap();

        let items = vec![PlanItem {
            id: Some("fast".to_string()),
            command: words(&["true"]),
        }];
        let summary = run_batch(&settings, &items, true, &mut Vec::new()).unwrap();
        assert!(summary.is_success());

        let saved: std::collections::BTreeMap<String, f64> = cache
            .get("duration/testdurations", std::collections::BTreeMap::new())
            .unwrap();
        assert_eq!(saved.get("gone"), Some(&1.0));
        assert!(saved.contains_key("fast"));
    }

    #[test]
    fn test_batch_command_exit_code() {
        let (temp, settings) = temp_settings();
        let plan = temp.path().join("plan.json");
        std::fs::write(&plan, r#"[{"id": "broken", "command": ["false"]}]"#).unwrap();

        let (result, _) = output_of(&settings, &["slowcheck", "batch", plan.to_str().unwrap()]);
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_file_cache_shared_between_runs() {
        let (_temp, settings) = temp_settings();

        output_of(&settings, &["slowcheck", "run", "--id", "twice", "--", "true"])
            .0
            .unwrap();
        let (result, output) =
            output_of(&settings, &["slowcheck", "run", "--id", "twice", "--", "true"]);

        // A near-zero first run can make the second one regress on timing noise.
        if result.is_ok() {
            assert!(output.contains("(last "), "{output}");
        }
        let reopened = FileCache::new(&settings.cache_dir);
        assert!(reopened.get_value("duration/twice").unwrap().is_some());
    }
}
