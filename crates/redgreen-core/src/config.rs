use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// RunnerOverride
// ---------------------------------------------------------------------------

/// Explicit test/lint commands that take precedence over detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<String>,
}

// ---------------------------------------------------------------------------
// LoopConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    #[serde(default = "default_stale_hours")]
    pub stale_after_hours: u32,
    #[serde(default = "default_test_timeout")]
    pub test_timeout_secs: u64,
    #[serde(default = "default_lint_timeout")]
    pub lint_timeout_secs: u64,
    #[serde(default = "default_story_window")]
    pub story_window_minutes: u32,
    #[serde(default = "default_story_dirs")]
    pub story_dirs: Vec<PathBuf>,
    #[serde(default = "default_tail_chars")]
    pub failure_tail_chars: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerOverride>,
}

/// One year. Larger staleness thresholds are accepted but flagged.
const MAX_STALE_AFTER_HOURS: u32 = 24 * 365;

fn default_stale_hours() -> u32 {
    2
}

fn default_test_timeout() -> u64 {
    300
}

fn default_lint_timeout() -> u64 {
    120
}

fn default_story_window() -> u32 {
    60
}

fn default_story_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("docs/stories"),
        PathBuf::from("stories"),
        PathBuf::from("docs"),
    ]
}

fn default_tail_chars() -> usize {
    1000
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            stale_after_hours: default_stale_hours(),
            test_timeout_secs: default_test_timeout(),
            lint_timeout_secs: default_lint_timeout(),
            story_window_minutes: default_story_window(),
            story_dirs: default_story_dirs(),
            failure_tail_chars: default_tail_chars(),
            runner: None,
        }
    }
}

impl LoopConfig {
    /// Load `.claude/redgreen.yaml`. A missing file yields the defaults; a
    /// malformed one is an error the caller decides how to handle.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: LoopConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`LoopConfig::load`], but a broken file only costs a warning.
    pub fn load_or_default(root: &Path) -> Self {
        Self::load(root).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable config, using defaults");
            Self::default()
        })
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.stale_after_hours))
    }

    pub fn story_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.story_window_minutes))
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    pub fn lint_timeout(&self) -> Duration {
        Duration::from_secs(self.lint_timeout_secs)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.stale_after_hours == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "stale_after_hours is 0: every workflow is treated as stale and the hook never advances".to_string(),
            });
        }

        if self.stale_after_hours > MAX_STALE_AFTER_HOURS {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "stale_after_hours is {}: more than a year, so workflows effectively never go stale",
                    self.stale_after_hours
                ),
            });
        }

        for (key, secs) in [
            ("test_timeout_secs", self.test_timeout_secs),
            ("lint_timeout_secs", self.lint_timeout_secs),
        ] {
            if secs == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("{key} is 0: the command runs without a timeout"),
                });
            }
        }

        if self.failure_tail_chars == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "failure_tail_chars is 0: remediation will not quote any test output"
                    .to_string(),
            });
        }

        for dir in &self.story_dirs {
            if dir.is_absolute() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "story dir '{}' is absolute; story dirs are resolved against the project root",
                        dir.display()
                    ),
                });
            }
        }

        if let Some(runner) = &self.runner {
            for (key, value) in [("runner.command", &runner.command), ("runner.lint", &runner.lint)] {
                if value.as_deref().is_some_and(|c| c.trim().is_empty()) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!("{key} is empty"),
                    });
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
