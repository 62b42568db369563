//! Test-runner detection.
//!
//! Probes the project root for build-tool manifests in a fixed order and
//! returns the conventional test and lint invocations of the first match.
//! Detection never fails: unreadable or malformed manifests are skipped.

use crate::config::LoopConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    Npm,
    Pytest,
    Dotnet,
    Go,
    Cargo,
    /// Commands supplied by `runner:` in the config file.
    Configured,
    Unknown,
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunnerKind::Npm => "npm",
            RunnerKind::Pytest => "pytest",
            RunnerKind::Dotnet => "dotnet",
            RunnerKind::Go => "go",
            RunnerKind::Cargo => "cargo",
            RunnerKind::Configured => "configured",
            RunnerKind::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerInfo {
    pub kind: RunnerKind,
    pub command: Option<String>,
    pub lint: Option<String>,
}

impl RunnerInfo {
    pub fn none() -> Self {
        Self {
            kind: RunnerKind::Unknown,
            command: None,
            lint: None,
        }
    }

    fn of(kind: RunnerKind, command: &str, lint: &str) -> Self {
        Self {
            kind,
            command: Some(command.to_string()),
            lint: Some(lint.to_string()),
        }
    }

    /// Whether the first word of the test command resolves on `PATH`.
    /// `None` when there is no test command.
    pub fn program_on_path(&self) -> Option<bool> {
        let program = self.command.as_deref()?.split_whitespace().next()?;
        Some(which::which(program).is_ok())
    }
}

/// Directories never descended into while looking for project files.
pub(crate) const SKIP_DIRS: &[&str] = &["node_modules", "target", "bin", "obj", "dist", "build", "vendor"];
const MAX_SEARCH_DEPTH: usize = 4;

/// Detect the runner for `root`, honouring any override in `config`.
pub fn detect_with(root: &Path, config: &LoopConfig) -> RunnerInfo {
    let detected = detect(root);
    let Some(over) = &config.runner else {
        return detected;
    };
    let command = over.command.clone().filter(|c| !c.trim().is_empty());
    let lint = over.lint.clone().filter(|c| !c.trim().is_empty());
    if command.is_none() && lint.is_none() {
        return detected;
    }
    RunnerInfo {
        kind: RunnerKind::Configured,
        command: command.or(detected.command),
        lint: lint.or(detected.lint),
    }
}

/// Probe `root` for known build ecosystems.
pub fn detect(root: &Path) -> RunnerInfo {
    if has_npm_test_script(root) {
        return RunnerInfo::of(RunnerKind::Npm, "npm test", "npm run lint");
    }

    if ["pytest.ini", "pyproject.toml", "setup.py"]
        .iter()
        .any(|f| root.join(f).is_file())
    {
        return RunnerInfo::of(
            RunnerKind::Pytest,
            "pytest",
            "ruff check . || pylint **/*.py",
        );
    }

    if contains_file_with_extension(root, "csproj", MAX_SEARCH_DEPTH) {
        return RunnerInfo::of(
            RunnerKind::Dotnet,
            "dotnet test",
            "dotnet format --verify-no-changes",
        );
    }

    if root.join("go.mod").is_file() {
        return RunnerInfo::of(RunnerKind::Go, "go test ./...", "golangci-lint run");
    }

    if root.join("Cargo.toml").is_file() {
        return RunnerInfo::of(
            RunnerKind::Cargo,
            "cargo test",
            "cargo clippy -- -D warnings",
        );
    }

    RunnerInfo::none()
}

fn has_npm_test_script(root: &Path) -> bool {
    let Ok(data) = std::fs::read_to_string(root.join("package.json")) else {
        return false;
    };
    let Ok(pkg) = serde_json::from_str::<serde_json::Value>(&data) else {
        tracing::debug!("package.json is not valid JSON, skipping npm detection");
        return false;
    };
    pkg.get("scripts")
        .and_then(|s| s.get("test"))
        .is_some()
}

fn contains_file_with_extension(dir: &Path, ext: &str, depth: usize) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_file() {
            if path.extension().is_some_and(|e| e == ext) {
                return true;
            }
        } else if file_type.is_dir() && depth > 0 {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with('.') && !SKIP_DIRS.contains(&name.as_ref()) {
                subdirs.push(path);
            }
        }
    }
    subdirs
        .iter()
        .any(|d| contains_file_with_extension(d, ext, depth - 1))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
