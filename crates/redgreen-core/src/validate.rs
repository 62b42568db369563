//! Phase-completion validation.
//!
//! Validation runs the project's own test and lint commands and turns the
//! outcome into a [`ValidationResult`]. A failed check is a value, not an
//! error: the caller hands the remediation text to the next actor.

use crate::classify::{matched_signatures, FailureClassifier, FailureKind};
use crate::config::LoopConfig;
use crate::detect::RunnerInfo;
use crate::exec::{CommandRunner, TestRunOutcome};
use crate::state::WorkflowState;
use crate::step::Validation;
use serde::Serialize;

/// Bound on the output quoted when tests fail on tooling errors.
const TOOLING_HEAD_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ValidationResult {
    pub fn passed(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
            remediation: None,
        }
    }

    pub fn failed(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            remediation: Some(remediation.into()),
        }
    }
}

pub struct Validator<'a> {
    runner: &'a dyn CommandRunner,
    classifier: &'a dyn FailureClassifier,
    config: &'a LoopConfig,
}

impl<'a> Validator<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        classifier: &'a dyn FailureClassifier,
        config: &'a LoopConfig,
    ) -> Self {
        Self {
            runner,
            classifier,
            config,
        }
    }

    pub fn validate(
        &self,
        validation: Validation,
        info: &RunnerInfo,
        state: &WorkflowState,
    ) -> ValidationResult {
        let result = match validation {
            Validation::None => ValidationResult::passed("No validation required"),
            Validation::Red => self.red(info, state),
            Validation::Green => self.green(info, state),
            Validation::GreenFull => self.green_full(info, state),
        };
        tracing::debug!(%validation, valid = result.valid, message = %result.message, "validated step");
        result
    }

    fn run_tests(&self, info: &RunnerInfo) -> TestRunOutcome {
        match info.command.as_deref() {
            Some(cmd) => self.runner.run(cmd, self.config.test_timeout()),
            None => TestRunOutcome::undetermined("no test runner detected"),
        }
    }

    fn red(&self, info: &RunnerInfo, state: &WorkflowState) -> ValidationResult {
        let outcome = self.run_tests(info);
        let story = state.story_display();

        if outcome.timed_out {
            return ValidationResult::failed(
                format!("Tests did not finish: {}", outcome.stderr.trim()),
                format!(
                    "TDD RED PHASE: Tests timed out\n\n\
                     A hung run proves nothing about the new tests. Make them finish \
                     quickly and fail on their assertions.\n\n\
                     Story file: {story}"
                ),
            );
        }

        match outcome.succeeded {
            None => ValidationResult::failed(
                format!("Cannot validate: {}", outcome.stderr.trim()),
                "Configure a test runner (a project manifest, or runner.command in \
                 .claude/redgreen.yaml), then write one failing test per acceptance criterion.",
            ),
            Some(true) => ValidationResult::failed(
                "RED PHASE VIOLATION: Tests are passing but should FAIL.\n\n\
                 Tests must fail with assertion errors before implementation begins.",
                format!(
                    "TDD RED PHASE NOT COMPLETE\n\n\
                     Tests are currently PASSING but should be FAILING.\n\n\
                     In the RED phase tests describe behaviour that does not exist yet, \
                     so they must fail. Passing tests usually mean one of:\n\
                     1. The tests do not exercise new functionality\n\
                     2. The tests have no real assertions\n\
                     3. The feature already exists\n\n\
                     ACTION REQUIRED:\n\
                     1. Review the tests: do they cover NEW behaviour?\n\
                     2. Add assertions that fail until the feature is implemented\n\
                     3. Run the tests and confirm they fail on assertions\n\n\
                     Story file: {story}"
                ),
            ),
            Some(false) => {
                let output = outcome.combined();
                if self.classifier.classify(&output) == FailureKind::ToolingError {
                    tracing::debug!(signatures = ?matched_signatures(&output), "red run failed on tooling errors");
                    return ValidationResult::failed(
                        "Tests have errors (not assertion failures).\n\nFix syntax/import errors first.",
                        format!(
                            "TDD RED PHASE: Fix test errors\n\n\
                             Tests are failing on ERRORS, not assertions:\n\
                             {}\n\n\
                             Fix the errors, not the feature. Tests must compile, import and \
                             resolve, then fail on their assertions.\n\n\
                             Story file: {story}",
                            head_chars(&output, TOOLING_HEAD_CHARS)
                        ),
                    );
                }
                ValidationResult::passed("RED phase validated: Tests fail with assertions")
            }
        }
    }

    fn green(&self, info: &RunnerInfo, state: &WorkflowState) -> ValidationResult {
        let outcome = self.run_tests(info);
        let story = state.story_display();

        match outcome.succeeded {
            Some(true) => ValidationResult::passed("GREEN phase validated: All tests pass"),
            None => ValidationResult::failed(
                format!("Cannot validate: {}", outcome.stderr.trim()),
                "Ensure a test runner is configured (runner.command in .claude/redgreen.yaml) \
                 and run the tests.",
            ),
            Some(false) => ValidationResult::failed(
                "GREEN PHASE: Tests still failing.",
                format!(
                    "TDD GREEN PHASE NOT COMPLETE\n\n\
                     Tests are still FAILING. Keep implementing until they pass.\n\n\
                     Test output:\n{}\n\n\
                     ACTION REQUIRED:\n\
                     1. Read the failing output above\n\
                     2. Implement the MINIMAL code that makes the next test pass\n\
                     3. Run the tests again\n\
                     4. Repeat until ALL tests pass\n\n\
                     Story file: {story}\n\n\
                     Do NOT stop until all tests pass.",
                    tail_chars(&outcome.combined(), self.config.failure_tail_chars)
                ),
            ),
        }
    }

    fn green_full(&self, info: &RunnerInfo, state: &WorkflowState) -> ValidationResult {
        let story = state.story_display();
        let tests = self.run_tests(info);
        if tests.succeeded != Some(true) {
            return ValidationResult::failed(
                "Full suite validation: Tests failing.",
                format!(
                    "VERIFICATION FAILED: Tests not passing\n\n\
                     Test output:\n{}\n\n\
                     All tests must pass before the completion gate.\n\
                     Fix the failures and verify again.\n\n\
                     Story file: {story}",
                    tail_chars(&tests.combined(), self.config.failure_tail_chars)
                ),
            );
        }

        let Some(lint_cmd) = info.lint.as_deref() else {
            return ValidationResult::passed("Full validation passed: Tests pass, no lint configured");
        };
        let lint = self.runner.run(lint_cmd, self.config.lint_timeout());
        match lint.succeeded {
            Some(true) => ValidationResult::passed("Full validation passed: Tests + lint clean"),
            Some(false) => ValidationResult::failed(
                "Full suite validation: Lint errors.",
                format!(
                    "VERIFICATION FAILED: Lint errors\n\n\
                     Lint output:\n{}\n\n\
                     Fix lint errors before proceeding.\n\n\
                     Story file: {story}",
                    tail_chars(&lint.combined(), self.config.failure_tail_chars)
                ),
            ),
            None => ValidationResult::failed(
                format!("Cannot validate lint: {}", lint.stderr.trim()),
                format!(
                    "The lint command `{lint_cmd}` could not be run. Install it, or set \
                     runner.lint in .claude/redgreen.yaml.\n\nStory file: {story}"
                ),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Output trimming
// ---------------------------------------------------------------------------

/// The first `max` characters of `s`.
pub fn head_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The last `max` characters of `s`.
pub fn tail_chars(s: &str, max: usize) -> &str {
    if max == 0 {
        return "";
    }
    match s.char_indices().rev().nth(max - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::HeuristicClassifier;
    use crate::detect::RunnerKind;
    use crate::step::StepId;
    use chrono::Utc;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Replays a canned outcome per command and records what was run.
    #[derive(Default)]
    struct Scripted {
        outcomes: HashMap<String, TestRunOutcome>,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn with(mut self, cmd: &str, outcome: TestRunOutcome) -> Self {
            self.outcomes.insert(cmd.to_string(), outcome);
            self
        }
    }

    impl CommandRunner for Scripted {
        fn run(&self, command: &str, _timeout: Duration) -> TestRunOutcome {
            self.calls.borrow_mut().push(command.to_string());
            self.outcomes
                .get(command)
                .cloned()
                .unwrap_or_else(|| TestRunOutcome::undetermined("not scripted"))
        }
    }

    fn info(lint: Option<&str>) -> RunnerInfo {
        RunnerInfo {
            kind: RunnerKind::Configured,
            command: Some("test".to_string()),
            lint: lint.map(str::to_string),
        }
    }

    fn state() -> WorkflowState {
        let mut s = WorkflowState::new("p", "s", StepId::WriteFailingTests, Utc::now());
        s.story_file = "docs/stories/login.md".to_string();
        s
    }

    fn check(runner: &Scripted, validation: Validation, info: &RunnerInfo) -> ValidationResult {
        let config = LoopConfig::default();
        Validator::new(runner, &HeuristicClassifier, &config).validate(validation, info, &state())
    }

    #[test]
    fn none_always_passes_without_running() {
        let runner = Scripted::default();
        assert!(check(&runner, Validation::None, &info(None)).valid);
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn red_with_passing_tests_is_a_violation_whatever_the_output() {
        for output in ["", "AssertionError", "SyntaxError"] {
            let runner = Scripted::default().with("test", TestRunOutcome::finished(0, output, ""));
            let result = check(&runner, Validation::Red, &info(None));
            assert!(!result.valid);
            assert!(result.message.contains("RED PHASE VIOLATION"));
            assert!(result.remediation.unwrap().contains("docs/stories/login.md"));
        }
    }

    #[test]
    fn red_with_assertion_failures_is_valid() {
        let runner = Scripted::default().with(
            "test",
            TestRunOutcome::finished(1, "", "AssertionError: expected 200 got 404"),
        );
        let result = check(&runner, Validation::Red, &info(None));
        assert!(result.valid, "{result:?}");
        assert!(result.remediation.is_none());
    }

    #[test]
    fn red_with_import_errors_asks_to_fix_errors() {
        let runner = Scripted::default().with(
            "test",
            TestRunOutcome::finished(2, "ImportError: cannot import name 'login'", ""),
        );
        let result = check(&runner, Validation::Red, &info(None));
        assert!(!result.valid);
        let remediation = result.remediation.unwrap();
        assert!(remediation.contains("Fix the errors, not the feature"));
        assert!(remediation.contains("cannot import name 'login'"));
    }

    #[test]
    fn red_without_runner_cannot_validate() {
        let runner = Scripted::default();
        let result = check(&runner, Validation::Red, &RunnerInfo::none());
        assert!(!result.valid);
        assert!(result.message.starts_with("Cannot validate"));
        assert!(result.remediation.unwrap().contains("Configure a test runner"));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn red_timeout_blocks() {
        let runner = Scripted::default()
            .with("test", TestRunOutcome::timed_out(Duration::from_secs(300)));
        let result = check(&runner, Validation::Red, &info(None));
        assert!(!result.valid);
        assert!(result.message.contains("timed out after 300s"));
        assert!(result.remediation.unwrap().contains("fail on their assertions"));
    }

    #[test]
    fn green_failure_quotes_the_tail_of_the_output() {
        let long = format!("{}END-OF-RUN", "x".repeat(5000));
        let runner = Scripted::default().with("test", TestRunOutcome::finished(1, long, ""));
        let result = check(&runner, Validation::Green, &info(None));
        assert!(!result.valid);
        let remediation = result.remediation.unwrap();
        assert!(remediation.contains("END-OF-RUN"));
        assert!(!remediation.contains(&"x".repeat(1001)));
        assert!(remediation.ends_with("Do NOT stop until all tests pass."));
    }

    #[test]
    fn green_passes_on_success() {
        let runner = Scripted::default().with("test", TestRunOutcome::finished(0, "ok", ""));
        assert!(check(&runner, Validation::Green, &info(None)).valid);
    }

    #[test]
    fn green_full_without_lint_passes_on_tests_alone() {
        let runner = Scripted::default().with("test", TestRunOutcome::finished(0, "", ""));
        assert!(check(&runner, Validation::GreenFull, &info(None)).valid);
        assert_eq!(*runner.calls.borrow(), vec!["test".to_string()]);
    }

    #[test]
    fn green_full_requires_clean_lint() {
        let runner = Scripted::default()
            .with("test", TestRunOutcome::finished(0, "", ""))
            .with("lint", TestRunOutcome::finished(1, "src/a.rs:1 unused import", ""));
        let result = check(&runner, Validation::GreenFull, &info(Some("lint")));
        assert!(!result.valid);
        assert!(result.message.contains("Lint errors"));
        assert!(result.remediation.unwrap().contains("unused import"));
    }

    #[test]
    fn green_full_skips_lint_when_tests_fail() {
        let runner = Scripted::default()
            .with("test", TestRunOutcome::finished(1, "1 failed", ""))
            .with("lint", TestRunOutcome::finished(0, "", ""));
        let result = check(&runner, Validation::GreenFull, &info(Some("lint")));
        assert!(!result.valid);
        assert_eq!(*runner.calls.borrow(), vec!["test".to_string()]);
    }

    #[test]
    fn green_full_blocks_when_lint_cannot_run() {
        let runner = Scripted::default().with("test", TestRunOutcome::finished(0, "", ""));
        let result = check(&runner, Validation::GreenFull, &info(Some("lint")));
        assert!(!result.valid);
        assert!(result.message.starts_with("Cannot validate lint"));
    }

    #[test]
    fn trimming_is_char_safe() {
        assert_eq!(head_chars("héllo", 2), "hé");
        assert_eq!(tail_chars("héllo", 4), "éllo");
        assert_eq!(tail_chars("abc", 10), "abc");
        assert_eq!(tail_chars("abc", 0), "");
        assert_eq!(head_chars("abc", 10), "abc");
    }
}
