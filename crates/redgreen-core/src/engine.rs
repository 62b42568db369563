//! The transition engine.
//!
//! One [`Engine`] call is one complete trigger: load the state, decide, persist,
//! and report what the next actor should see. Collaborators are injected so the
//! whole state machine runs against in-memory fakes in tests.

use crate::classify::FailureClassifier;
use crate::compose::{self, ComposeInput};
use crate::config::LoopConfig;
use crate::detect::{self, RunnerInfo};
use crate::error::{LoopError, Result};
use crate::exec::CommandRunner;
use crate::extension::ExtensionSource;
use crate::session::{self, Verdict};
use crate::state::{WorkflowState, WorkflowStateRepository};
use crate::step::{self, StepId};
use crate::story;
use crate::validate::Validator;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::path::Path;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do; the trigger produces no output.
    Silent,
    /// Work for the next actor: a step directive or validation remediation.
    Directive(String),
    /// The workflow is parked at a gate.
    Gate(String),
    /// The workflow finished and its state was removed.
    Complete(String),
}

impl Outcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            Outcome::Silent => None,
            Outcome::Directive(t) | Outcome::Gate(t) | Outcome::Complete(t) => Some(t),
        }
    }

    /// The hook protocol payload: directives block the stop, banners are
    /// surfaced as system messages.
    pub fn hook_payload(&self) -> Option<serde_json::Value> {
        match self {
            Outcome::Silent => None,
            Outcome::Directive(reason) => Some(json!({ "decision": "block", "reason": reason })),
            Outcome::Gate(message) | Outcome::Complete(message) => {
                Some(json!({ "systemMessage": message }))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cancelled {
    /// Zero-based registry index and step id the workflow stopped at.
    Stopped { index: usize, step: String },
    /// A state file existed but could not be parsed; it was removed.
    Unreadable,
    NothingActive,
}

/// `[redgreen - Step 3/7: write_failing_tests]`
pub fn step_header(index: usize) -> String {
    let id = step::step_at(index).map(|s| s.id.as_str()).unwrap_or("complete");
    format!("[redgreen - Step {}/{}: {id}]", index.saturating_add(1), step::step_count())
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine<'a> {
    pub root: &'a Path,
    pub config: &'a LoopConfig,
    pub repo: &'a dyn WorkflowStateRepository,
    pub runner: &'a dyn CommandRunner,
    pub classifier: &'a dyn FailureClassifier,
    pub extensions: &'a dyn ExtensionSource,
    pub now: DateTime<Utc>,
}

impl<'a> Engine<'a> {
    fn runner_info(&self) -> RunnerInfo {
        detect::detect_with(self.root, self.config)
    }

    /// Directive (or gate banner) for the step the state is positioned at.
    pub fn instruction_for(&self, state: &WorkflowState) -> String {
        let Some(def) = state.current() else {
            return compose::completion_message(&state.story_file);
        };
        if def.is_gate() {
            return compose::gate_message(def.id, &state.story_file);
        }
        let runner = self.runner_info();
        let conventions = compose::detect_conventions(self.root, &runner);
        let extensions = def
            .role
            .map(|role| self.extensions.discover(role))
            .unwrap_or_default();
        compose::compose(&ComposeInput {
            step: def.id,
            story_file: &state.story_file,
            prompt: &state.prompt,
            runner: &runner,
            conventions: &conventions,
            extensions: &extensions,
        })
    }

    fn positioned(&self, state: &WorkflowState) -> Outcome {
        let header = step_header(state.current_step_index);
        let body = self.instruction_for(state);
        if state.paused_for_manual {
            Outcome::Gate(format!("{header}\n{body}"))
        } else {
            Outcome::Directive(format!("{header}\n\n{body}"))
        }
    }

    fn complete(&self, state: &WorkflowState) -> Result<Outcome> {
        self.repo.delete()?;
        tracing::debug!(story = %state.story_file, "workflow complete");
        Ok(Outcome::Complete(compose::completion_message(&state.story_file)))
    }

    // -----------------------------------------------------------------------
    // Hook trigger
    // -----------------------------------------------------------------------

    /// Run one end-of-turn trigger on behalf of `caller_session`.
    pub fn advance(&self, caller_session: &str) -> Result<Outcome> {
        let Some(mut state) = self.repo.load() else {
            return Ok(Outcome::Silent);
        };
        if !state.active {
            tracing::debug!("workflow inactive, ignoring");
            return Ok(Outcome::Silent);
        }

        match session::check(&state, caller_session, self.now, self.config.stale_after()) {
            Verdict::Owned => {}
            verdict => {
                tracing::debug!(?verdict, "workflow not resumable from this session");
                return Ok(Outcome::Silent);
            }
        }

        if state.paused_for_manual {
            return Ok(Outcome::Silent);
        }

        let index = state.current_step_index;
        let Some(def) = state.current() else {
            return self.complete(&state);
        };
        if def.is_gate() {
            return Ok(Outcome::Silent);
        }

        let runner = self.runner_info();
        let result = Validator::new(self.runner, self.classifier, self.config).validate(
            def.validation,
            &runner,
            &state,
        );
        if !result.valid {
            let mut reason = format!("[redgreen - {}] {}", def.id, result.message);
            if let Some(remediation) = &result.remediation {
                reason.push_str("\n\n");
                reason.push_str(remediation);
            }
            return Ok(Outcome::Directive(reason));
        }

        let next = index + 1;
        if step::step_at(next).is_none() {
            return self.complete(&state);
        }

        if def.id == StepId::DraftStory && state.story_file.is_empty() {
            if let Some(found) = story::detect_recent_story(
                self.root,
                &self.config.story_dirs,
                self.now,
                self.config.story_window(),
            ) {
                state.story_file = found;
            }
        }

        state.move_to(next, self.now);
        self.repo.save(&state)?;
        tracing::debug!(from = %def.id, to = %state.current_step, "advanced");
        Ok(self.positioned(&state))
    }

    // -----------------------------------------------------------------------
    // Operator commands
    // -----------------------------------------------------------------------

    /// Start a workflow. Fails if any state file exists, readable or not.
    pub fn setup(&self, prompt: &str, session_id: &str, start: StepId) -> Result<Outcome> {
        if self.repo.exists() {
            return Err(LoopError::AlreadyActive);
        }
        let state = WorkflowState::new(prompt, session_id, start, self.now);
        self.repo.save(&state)?;
        tracing::debug!(start = %start, session = %session_id, "workflow started");
        Ok(self.positioned(&state))
    }

    fn load_active(&self) -> Result<WorkflowState> {
        match self.repo.load() {
            Some(state) if state.active => Ok(state),
            _ => Err(LoopError::NoActiveWorkflow),
        }
    }

    /// Pass the current gate. Validation is not re-run: approval is the
    /// human sign-off.
    pub fn approve(&self) -> Result<Outcome> {
        let mut state = self.load_active()?;
        if !state.paused_for_manual {
            return Err(LoopError::NotAtGate {
                step: state.current_step,
            });
        }
        let Some(next) = state
            .current_step_index
            .checked_add(1)
            .filter(|&n| step::step_at(n).is_some())
        else {
            return self.complete(&state);
        };
        state.move_to(next, self.now);
        self.repo.save(&state)?;
        Ok(self.positioned(&state))
    }

    /// Send the workflow back to the current gate's loop-back target.
    pub fn reject(&self) -> Result<Outcome> {
        let mut state = self.load_active()?;
        if !state.paused_for_manual {
            return Err(LoopError::NotAtGate {
                step: state.current_step,
            });
        }
        let Some(target) = state.current().and_then(|d| d.loop_back) else {
            return Err(LoopError::NothingToReject {
                step: state.current_step,
            });
        };
        state.move_to(target, self.now);
        self.repo.save(&state)?;
        Ok(self.positioned(&state))
    }

    /// Remove the state file unconditionally.
    pub fn cancel(&self) -> Result<Cancelled> {
        let state = self.repo.load();
        let removed = self.repo.delete()?;
        Ok(match (state, removed) {
            (Some(s), _) => Cancelled::Stopped {
                index: s.current_step_index,
                step: s.current_step,
            },
            (None, true) => Cancelled::Unreadable,
            (None, false) => Cancelled::NothingActive,
        })
    }

    /// Record `file_path` as the story when it was written under a story dir
    /// and the owned, fresh workflow has none yet. Returns the recorded path.
    pub fn track_story(&self, caller_session: &str, file_path: &str) -> Result<Option<String>> {
        let Some(mut state) = self.repo.load() else {
            return Ok(None);
        };
        if !state.active
            || !state.story_file.is_empty()
            || session::check(&state, caller_session, self.now, self.config.stale_after())
                != Verdict::Owned
        {
            return Ok(None);
        }
        if !story::is_story_path(self.root, &self.config.story_dirs, file_path) {
            return Ok(None);
        }

        let path = Path::new(file_path);
        let recorded = if path.is_absolute() {
            story::display_relative(self.root, path)
        } else {
            file_path.trim_start_matches("./").to_string()
        };
        state.story_file = recorded.clone();
        state.touch(self.now);
        self.repo.save(&state)?;
        tracing::debug!(story = %recorded, "story recorded");
        Ok(Some(recorded))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::HeuristicClassifier;
    use crate::config::RunnerOverride;
    use crate::exec::TestRunOutcome;
    use crate::extension::{ExtensionDescriptor, StaticExtensions};
    use crate::state::MemoryStateRepository;
    use crate::step::Role;
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SESSION: &str = "session-1";

    /// Every run of the test command returns `outcome`.
    struct FixedRunner {
        outcome: TestRunOutcome,
        calls: RefCell<usize>,
    }

    impl FixedRunner {
        fn exit(code: i32, output: &str) -> Self {
            Self {
                outcome: TestRunOutcome::finished(code, output, ""),
                calls: RefCell::new(0),
            }
        }
    }

    impl CommandRunner for FixedRunner {
        fn run(&self, _command: &str, _timeout: std::time::Duration) -> TestRunOutcome {
            *self.calls.borrow_mut() += 1;
            self.outcome.clone()
        }
    }

    struct Fixture {
        dir: TempDir,
        config: LoopConfig,
        repo: MemoryStateRepository,
        runner: FixedRunner,
        extensions: StaticExtensions,
        now: DateTime<Utc>,
    }

    impl Fixture {
        fn new(runner: FixedRunner) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                config: LoopConfig {
                    runner: Some(RunnerOverride {
                        command: Some("run-tests".to_string()),
                        lint: None,
                    }),
                    ..LoopConfig::default()
                },
                repo: MemoryStateRepository::new(),
                runner,
                extensions: StaticExtensions::default(),
                now: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            }
        }

        fn engine(&self) -> Engine<'_> {
            Engine {
                root: self.dir.path(),
                config: &self.config,
                repo: &self.repo,
                runner: &self.runner,
                classifier: &HeuristicClassifier,
                extensions: &self.extensions,
                now: self.now,
            }
        }

        fn at(self, step: StepId) -> Self {
            let mut state = WorkflowState::new("Add login", SESSION, StepId::ReviewPreviousNotes, self.now);
            state.move_to(step.index(), self.now);
            self.repo.save(&state).unwrap();
            self
        }

        fn state(&self) -> WorkflowState {
            self.repo.load().unwrap()
        }
    }

    #[test]
    fn setup_places_workflow_at_first_step() {
        let fx = Fixture::new(FixedRunner::exit(0, ""));
        let out = fx.engine().setup("Add login", SESSION, StepId::ReviewPreviousNotes).unwrap();
        let state = fx.state();
        assert_eq!(state.current_step_index, 0);
        assert!(state.active);
        assert!(!state.paused_for_manual);
        match out {
            Outcome::Directive(text) => {
                assert!(text.starts_with("[redgreen - Step 1/7: review_previous_notes]"));
                assert!(text.contains("Workflow Context: Add login"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn setup_refuses_when_state_exists() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::DraftStory);
        let before = fx.repo.raw();
        let err = fx.engine().setup("again", SESSION, StepId::ReviewPreviousNotes).unwrap_err();
        assert!(matches!(err, LoopError::AlreadyActive));
        assert_eq!(fx.repo.raw(), before);
    }

    #[test]
    fn setup_refuses_over_unreadable_state() {
        let mut fx = Fixture::new(FixedRunner::exit(0, ""));
        fx.repo = MemoryStateRepository::with_raw("garbage");
        assert!(matches!(
            fx.engine().setup("p", SESSION, StepId::ReviewPreviousNotes),
            Err(LoopError::AlreadyActive)
        ));
    }

    #[test]
    fn setup_at_gate_pauses() {
        let fx = Fixture::new(FixedRunner::exit(0, ""));
        let out = fx.engine().setup("", SESSION, StepId::RedGate).unwrap();
        assert!(matches!(out, Outcome::Gate(_)));
        assert!(fx.state().paused_for_manual);
    }

    #[test]
    fn steps_without_validation_always_advance_by_one() {
        for step in [StepId::ReviewPreviousNotes, StepId::DraftStory] {
            let fx = Fixture::new(FixedRunner::exit(0, "")).at(step);
            fx.engine().advance(SESSION).unwrap();
            assert_eq!(fx.state().current_step_index, step.index() + 1);
            assert_eq!(*fx.runner.calls.borrow(), 0);
        }
    }

    #[test]
    fn red_violation_blocks_and_leaves_state() {
        let fx = Fixture::new(FixedRunner::exit(0, "3 passed")).at(StepId::WriteFailingTests);
        let before = fx.repo.raw();
        let out = fx.engine().advance(SESSION).unwrap();
        match out {
            Outcome::Directive(reason) => {
                assert!(reason.starts_with("[redgreen - write_failing_tests] RED PHASE VIOLATION"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fx.repo.raw(), before);
    }

    #[test]
    fn red_confirmed_parks_at_red_gate() {
        let fx = Fixture::new(FixedRunner::exit(1, "AssertionError: nope")).at(StepId::WriteFailingTests);
        let out = fx.engine().advance(SESSION).unwrap();
        match out {
            Outcome::Gate(msg) => {
                assert!(msg.starts_with("[redgreen - Step 4/7: red_gate]"));
                assert!(msg.contains("redgreen reject"));
            }
            other => panic!("unexpected {other:?}"),
        }
        let state = fx.state();
        assert_eq!(state.current_step, "red_gate");
        assert!(state.paused_for_manual);
        assert_eq!(state.last_activity, Some(fx.now));
    }

    #[test]
    fn foreign_session_is_ignored_without_mutation() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::DraftStory);
        let before = fx.repo.raw();
        assert_eq!(fx.engine().advance("someone-else").unwrap(), Outcome::Silent);
        assert_eq!(fx.engine().advance("").unwrap(), Outcome::Silent);
        assert_eq!(fx.repo.raw(), before);
    }

    #[test]
    fn stale_workflow_is_ignored() {
        let mut fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::DraftStory);
        fx.now += Duration::hours(3);
        let before = fx.repo.raw();
        assert_eq!(fx.engine().advance(SESSION).unwrap(), Outcome::Silent);
        assert_eq!(fx.repo.raw(), before);
    }

    #[test]
    fn inactive_or_paused_workflows_are_left_alone() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::RedGate);
        assert_eq!(fx.engine().advance(SESSION).unwrap(), Outcome::Silent);

        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::DraftStory);
        let mut state = fx.state();
        state.active = false;
        fx.repo.save(&state).unwrap();
        assert_eq!(fx.engine().advance(SESSION).unwrap(), Outcome::Silent);
        assert!(fx.repo.exists());
    }

    #[test]
    fn gate_without_pause_flag_is_still_parked() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::GreenGate);
        let mut state = fx.state();
        state.paused_for_manual = false;
        fx.repo.save(&state).unwrap();
        assert_eq!(fx.engine().advance(SESSION).unwrap(), Outcome::Silent);
        assert!(fx.repo.exists());
    }

    #[test]
    fn out_of_range_index_completes_and_deletes() {
        let fx = Fixture::new(FixedRunner::exit(0, ""));
        let mut state = WorkflowState::new("", SESSION, StepId::ReviewPreviousNotes, fx.now);
        state.current_step_index = 9;
        fx.repo.save(&state).unwrap();
        assert!(matches!(fx.engine().advance(SESSION).unwrap(), Outcome::Complete(_)));
        assert!(!fx.repo.exists());
    }

    #[test]
    fn leaving_draft_detects_recent_story() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::DraftStory);
        std::fs::create_dir_all(fx.dir.path().join("docs/stories")).unwrap();
        std::fs::write(fx.dir.path().join("docs/stories/2.1.reset.md"), "# Reset\n").unwrap();
        let mut fx = fx;
        fx.now = Utc::now();
        let mut state = fx.state();
        state.last_activity = Some(fx.now);
        fx.repo.save(&state).unwrap();

        let out = fx.engine().advance(SESSION).unwrap();
        assert_eq!(fx.state().story_file, "docs/stories/2.1.reset.md");
        let text = out.text().unwrap().to_string();
        assert!(text.contains("Story: docs/stories/2.1.reset.md"));
        assert!(text.contains("TDD RED PHASE"));
    }

    #[test]
    fn directive_lists_role_extensions() {
        let mut fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::DraftStory);
        fx.extensions = StaticExtensions(vec![ExtensionDescriptor {
            name: "ac-tracer".to_string(),
            description: "Trace tests to criteria".to_string(),
            role: Role::TestArchitect,
            priority: 1,
            path: PathBuf::from("/x/SKILL.md"),
        }]);
        let out = fx.engine().advance(SESSION).unwrap();
        assert!(out.text().unwrap().contains("- ac-tracer: Trace tests to criteria"));
    }

    #[test]
    fn approve_at_red_gate_moves_to_implement() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::RedGate);
        let out = fx.engine().approve().unwrap();
        let state = fx.state();
        assert_eq!(state.current_step, "implement_tasks");
        assert!(!state.paused_for_manual);
        assert!(out.text().unwrap().contains("TDD GREEN PHASE"));
        assert_eq!(*fx.runner.calls.borrow(), 0);
    }

    #[test]
    fn approve_at_final_gate_completes() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::GreenGate);
        let out = fx.engine().approve().unwrap();
        assert!(matches!(out, Outcome::Complete(_)));
        assert!(!fx.repo.exists());
    }

    #[test]
    fn approve_with_maximal_index_completes_instead_of_wrapping() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::GreenGate);
        let mut state = fx.state();
        state.current_step_index = usize::MAX;
        state.paused_for_manual = true;
        fx.repo.save(&state).unwrap();
        assert!(matches!(fx.engine().approve().unwrap(), Outcome::Complete(_)));
        assert!(!fx.repo.exists());
    }

    #[test]
    fn huge_staleness_threshold_does_not_panic() {
        let mut fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::ReviewPreviousNotes);
        fx.config.stale_after_hours = 3_000_000_000;
        let out = fx.engine().advance(SESSION).unwrap();
        assert!(matches!(out, Outcome::Directive(_)));
        assert_eq!(fx.state().current_step, "draft_story");
        assert!(fx.engine().track_story(SESSION, "docs/stories/a.md").unwrap().is_some());
    }

    #[test]
    fn red_timeout_blocks_instead_of_reaching_gate() {
        let fx = Fixture::new(FixedRunner {
            outcome: TestRunOutcome::timed_out(std::time::Duration::from_secs(300)),
            calls: RefCell::new(0),
        })
        .at(StepId::WriteFailingTests);
        let before = fx.repo.raw();
        match fx.engine().advance(SESSION).unwrap() {
            Outcome::Directive(reason) => assert!(reason.contains("timed out")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fx.repo.raw(), before);
    }

    #[test]
    fn approve_off_gate_is_an_operator_error() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::ImplementTasks);
        let before = fx.repo.raw();
        assert!(matches!(fx.engine().approve(), Err(LoopError::NotAtGate { .. })));
        assert_eq!(fx.repo.raw(), before);

        let fx = Fixture::new(FixedRunner::exit(0, ""));
        assert!(matches!(fx.engine().approve(), Err(LoopError::NoActiveWorkflow)));
    }

    #[test]
    fn reject_at_red_gate_loops_back_to_planning() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::RedGate);
        let out = fx.engine().reject().unwrap();
        let state = fx.state();
        assert_eq!(state.current_step_index, 0);
        assert!(!state.paused_for_manual);
        assert!(out.text().unwrap().starts_with("[redgreen - Step 1/7: review_previous_notes]"));
    }

    #[test]
    fn reject_at_green_gate_changes_nothing() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::GreenGate);
        let before = fx.repo.raw();
        assert!(matches!(
            fx.engine().reject(),
            Err(LoopError::NothingToReject { .. })
        ));
        assert_eq!(fx.repo.raw(), before);
    }

    #[test]
    fn cancel_reports_position_and_is_idempotent() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::ImplementTasks);
        assert_eq!(
            fx.engine().cancel().unwrap(),
            Cancelled::Stopped {
                index: 4,
                step: "implement_tasks".to_string()
            }
        );
        assert_eq!(fx.engine().cancel().unwrap(), Cancelled::NothingActive);
    }

    #[test]
    fn cancel_removes_unreadable_state() {
        let mut fx = Fixture::new(FixedRunner::exit(0, ""));
        fx.repo = MemoryStateRepository::with_raw("not a state file");
        assert_eq!(fx.engine().cancel().unwrap(), Cancelled::Unreadable);
        assert!(!fx.repo.exists());
    }

    #[test]
    fn track_story_records_once_for_owner() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::DraftStory);
        assert_eq!(fx.engine().track_story("other", "docs/stories/a.md").unwrap(), None);
        assert_eq!(fx.engine().track_story(SESSION, "src/main.rs").unwrap(), None);
        assert_eq!(
            fx.engine().track_story(SESSION, "docs/stories/a.md").unwrap(),
            Some("docs/stories/a.md".to_string())
        );
        assert_eq!(fx.state().story_file, "docs/stories/a.md");
        assert_eq!(fx.engine().track_story(SESSION, "docs/stories/b.md").unwrap(), None);
    }

    #[test]
    fn track_story_relativizes_absolute_paths() {
        let fx = Fixture::new(FixedRunner::exit(0, "")).at(StepId::DraftStory);
        let abs = fx.dir.path().join("stories/x.md");
        let recorded = fx
            .engine()
            .track_story(SESSION, abs.to_str().unwrap())
            .unwrap();
        assert_eq!(recorded.as_deref(), Some("stories/x.md"));
    }

    #[test]
    fn hook_payload_shapes() {
        assert_eq!(Outcome::Silent.hook_payload(), None);
        let block = Outcome::Directive("do it".into()).hook_payload().unwrap();
        assert_eq!(block["decision"], "block");
        assert_eq!(block["reason"], "do it");
        let gate = Outcome::Gate("wait".into()).hook_payload().unwrap();
        assert_eq!(gate["systemMessage"], "wait");
        assert!(gate.get("decision").is_none());
    }
}
