use crate::output::{print_json, print_table};
use anyhow::Context;
use redgreen_core::config::{LoopConfig, WarnLevel};
use redgreen_core::detect;
use std::path::Path;

/// Show the effective configuration, the runner it resolves to, and any
/// validation warnings. Fails when a warning is error-level.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = LoopConfig::load(root).context("failed to load .claude/redgreen.yaml")?;
    let warnings = config.validate();
    let runner = detect::detect_with(root, &config);

    if json {
        print_json(&serde_json::json!({
            "config": config,
            "runner": runner,
            "warnings": warnings,
        }))?;
    } else {
        let story_dirs = config
            .story_dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let rows = vec![
            row("stale_after_hours", config.stale_after_hours),
            row("test_timeout_secs", config.test_timeout_secs),
            row("lint_timeout_secs", config.lint_timeout_secs),
            row("story_window_minutes", config.story_window_minutes),
            row("story_dirs", story_dirs),
            row("failure_tail_chars", config.failure_tail_chars),
            row("runner", runner.kind),
            row("test command", runner.command.as_deref().unwrap_or("(none)")),
            row("lint command", runner.lint.as_deref().unwrap_or("(none)")),
        ];
        print_table(&["KEY", "VALUE"], &rows);

        if runner.program_on_path() == Some(false) {
            println!("\nnote: the test command's program was not found on PATH");
        }
        if !warnings.is_empty() {
            println!();
            for w in &warnings {
                let prefix = match w.level {
                    WarnLevel::Warning => "warning",
                    WarnLevel::Error => "error",
                };
                println!("[{prefix}] {}", w.message);
            }
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

fn row(key: &str, value: impl ToString) -> Vec<String> {
    vec![key.to_string(), value.to_string()]
}
