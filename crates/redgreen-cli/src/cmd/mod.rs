pub mod cancel;
pub mod config;
pub mod gate;
pub mod hook;
pub mod setup;
pub mod status;

use anyhow::Context;
use redgreen_core::classify::HeuristicClassifier;
use redgreen_core::config::LoopConfig;
use redgreen_core::engine::{Engine, Outcome};
use redgreen_core::exec::ShellRunner;
use redgreen_core::extension::FsExtensionSource;
use redgreen_core::state::{FileStateRepository, WorkflowStateRepository};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Production collaborators for the engine, owned for the length of one
/// command.
pub struct Services {
    root: PathBuf,
    pub config: LoopConfig,
    pub repo: FileStateRepository,
    runner: ShellRunner,
    extensions: FsExtensionSource,
}

impl Services {
    fn with_config(root: &Path, config: LoopConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            repo: FileStateRepository::new(root),
            runner: ShellRunner::new(root),
            extensions: FsExtensionSource::for_project(root),
        }
    }

    /// A malformed config file is an error.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let config = LoopConfig::load(root).context("failed to load .claude/redgreen.yaml")?;
        Ok(Self::with_config(root, config))
    }

    /// A malformed config file falls back to defaults.
    pub fn lenient(root: &Path) -> Self {
        Self::with_config(root, LoopConfig::load_or_default(root))
    }

    pub fn engine(&self) -> Engine<'_> {
        Engine {
            root: &self.root,
            config: &self.config,
            repo: &self.repo,
            runner: &self.runner,
            classifier: &HeuristicClassifier,
            extensions: &self.extensions,
            now: chrono::Utc::now(),
        }
    }
}

/// JSON shape shared by commands that move the workflow.
#[derive(Serialize)]
pub struct TransitionOutput<'a> {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_index: Option<usize>,
    pub message: &'a str,
}

/// Print a transition result as text or JSON. `repo` is read back to report
/// where the workflow now stands.
pub fn print_outcome(
    outcome: &Outcome,
    repo: &dyn WorkflowStateRepository,
    json: bool,
) -> anyhow::Result<()> {
    let text = outcome.text().unwrap_or_default();
    if json {
        let state = repo.load();
        let kind = match outcome {
            Outcome::Silent => "silent",
            Outcome::Directive(_) => "directive",
            Outcome::Gate(_) => "gate",
            Outcome::Complete(_) => "complete",
        };
        crate::output::print_json(&TransitionOutput {
            outcome: kind,
            current_step: state.as_ref().map(|s| s.current_step.clone()),
            current_step_index: state.as_ref().map(|s| s.current_step_index),
            message: text,
        })
    } else {
        if !text.is_empty() {
            println!("{text}");
        }
        Ok(())
    }
}
