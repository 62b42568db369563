//! Instruction composition.
//!
//! Every agent step gets a self-contained directive: what the step is, who
//! performs it and under which rules, what the project looks like, and a fixed
//! checklist. The text is built from static per-step data so that adding a step
//! is a compile error until its brief exists.

use crate::detect::{RunnerInfo, SKIP_DIRS};
use crate::extension::ExtensionDescriptor;
use crate::step::{Role, StepId};
use std::collections::BTreeSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// Static text
// ---------------------------------------------------------------------------

pub fn role_card(role: Role) -> &'static str {
    match role {
        Role::Planner => {
            "Role: Story Planner\n\
             Focus: Breaking epics into stories with clear acceptance criteria and sizing\n\
             Rules: Never implement code. Cite sources as [Source: path]. Read files directly.\n\
             Story: YAML frontmatter + acceptance criteria (Given/When/Then) + tasks of 1-3 days each"
        }
        Role::TestArchitect => {
            "Role: Test Architect\n\
             Focus: Requirements traceability, test design, quality gates\n\
             Rules: Only update the QA Results section of the story. Map every acceptance criterion to a test.\n\
             Trace: test_ac{N}_{desc}() or an `AC-{N}:` comment or docstring\n\
             Tests: Extend existing test files first. Follow the project's naming conventions."
        }
        Role::Developer => {
            "Role: Developer\n\
             Focus: Minimal implementation that makes the failing tests pass\n\
             Rules: The story file is the single source of truth. Update only the Dev Agent Record section.\n\
             Process: Read failing test -> implement minimal code -> run tests -> iterate"
        }
    }
}

pub const RETRIEVAL_INSTRUCTION: &str = "IMPORTANT: Prefer reading actual project files over pre-trained assumptions.\n\
Always search the project for its conventions before writing code or tests.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSet {
    Planning,
    Red,
    Green,
    Review,
}

pub fn inline_rules(set: RuleSet) -> &'static str {
    match set {
        RuleSet::Planning => {
            "Rules:\n\
             - Commits: reference the story id in every message. Work on a story branch; never commit to main.\n\
             - Cite sources: [Source: path/to/file.md]. Read files directly, never assume."
        }
        RuleSet::Red => {
            "Rules:\n\
             - File writes: at most 30 lines per operation. Chunk larger writes.\n\
             - Cite sources: [Source: path]. Read files directly, never assume."
        }
        RuleSet::Green => {
            "Rules:\n\
             - File writes: at most 30 lines per operation. Chunk larger writes.\n\
             - Destructive operations: validate paths before deleting anything.\n\
             - Cite sources: [Source: path]. Read files directly."
        }
        RuleSet::Review => {
            "Rules:\n\
             - Commits: reference the story id in every message. Work on a story branch; never commit to main.\n\
             - Cite sources: [Source: path]. Read files directly."
        }
    }
}

// ---------------------------------------------------------------------------
// Step briefs
// ---------------------------------------------------------------------------

/// One line of a step checklist.
#[derive(Debug, Clone, Copy)]
pub enum Item {
    Text(&'static str),
    /// Names the test command when one is known.
    RunTests { with: &'static str, without: &'static str },
    /// Names the lint command when one is known.
    RunLint { with: &'static str, without: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct StepBrief {
    pub title: &'static str,
    pub rules: RuleSet,
    /// Planning steps carry the seeding prompt; later steps work from the story.
    pub shows_prompt: bool,
    pub shows_story: bool,
    /// Text inserted before the checklist.
    pub preamble: &'static [&'static str],
    pub checklist: &'static [Item],
    /// Text after the rules and retrieval reminder.
    pub closing: &'static [&'static str],
}

/// Brief for an agent step; `None` for gates.
pub fn brief(step: StepId) -> Option<StepBrief> {
    use Item::*;
    match step {
        StepId::ReviewPreviousNotes => Some(StepBrief {
            title: "PLANNING REVIEW: Review Context Before Drafting",
            rules: RuleSet::Planning,
            shows_prompt: true,
            shows_story: false,
            preamble: &[],
            checklist: &[
                Text("Find previous stories (docs/stories/*.md)"),
                Text("Read completed stories for context and lessons learned"),
                Text("Search for dev notes, retrospectives and QA feedback"),
                Text("Identify patterns, conventions and technical decisions"),
                Text("Summarize the findings that should shape the next story"),
            ],
            closing: &[],
        }),
        StepId::DraftStory => Some(StepBrief {
            title: "STORY DRAFTING: Create Next Story",
            rules: RuleSet::Planning,
            shows_prompt: true,
            shows_story: false,
            preamble: &[],
            checklist: &[
                Text("Find epic and architecture docs (docs/*.md, docs/epics/*.md)"),
                Text("Read requirements and technical constraints"),
                Text("Draft the story with YAML frontmatter (status, size, epic link)"),
                Text("Write acceptance criteria in Given/When/Then form"),
                Text("Break the work into tasks of 1-3 days each"),
                Text("Save the story under docs/stories/"),
            ],
            closing: &[],
        }),
        StepId::WriteFailingTests => Some(StepBrief {
            title: "TDD RED PHASE: Write Failing Tests",
            rules: RuleSet::Red,
            shows_prompt: false,
            shows_story: true,
            preamble: &[
                "Trace Convention (REQUIRED):",
                "  Map each test to its acceptance criterion. Every criterion needs at least one mapped test.",
            ],
            checklist: &[
                Text("Read the story file and extract every acceptance criterion"),
                Text("Find existing test files (*.test.*, *.spec.*, *_test.*, test_*.*)"),
                Text("Read existing tests to learn their patterns"),
                Text("Extend existing files where they fit, create new ones only if needed"),
                Text("Write one failing test per criterion with a clear assertion"),
                RunTests {
                    with: "Run: {cmd} - verify FAIL with assertion errors (not syntax/import)",
                    without: "Run the tests - verify FAIL with assertion errors (not syntax/import)",
                },
                Text("Record the test-to-criterion mapping in the story"),
            ],
            closing: &[
                "CRITICAL: Tests must FAIL cleanly (assertion failures, not errors).",
                "The tests are run and the RED state is checked before the workflow advances.",
            ],
        }),
        StepId::ImplementTasks => Some(StepBrief {
            title: "TDD GREEN PHASE: Make Failing Tests Pass",
            rules: RuleSet::Green,
            shows_prompt: false,
            shows_story: true,
            preamble: &[],
            checklist: &[
                Text("Read the failing test output to see what is missing"),
                Text("Find the implementation files to change"),
                Text("Write the MINIMAL code that makes the next test pass"),
                RunTests {
                    with: "Run: {cmd} - check progress",
                    without: "Run the tests - check progress",
                },
                Text("Iterate until ALL tests pass"),
                Text("Refactor while keeping the tests green"),
            ],
            closing: &[
                "CRITICAL: ALL tests must pass before the workflow advances.",
                "Do NOT stop until tests are GREEN.",
            ],
        }),
        StepId::VerifyGreenState => Some(StepBrief {
            title: "TDD GREEN STATE VERIFICATION: Confirm Implementation Complete",
            rules: RuleSet::Review,
            shows_prompt: false,
            shows_story: true,
            preamble: &[],
            checklist: &[
                Text("Run all tests (unit, integration, e2e)"),
                Text("Verify every test PASSES"),
                RunLint {
                    with: "Run linting: {cmd}",
                    without: "Run linting checks",
                },
                Text("Run type checks where the language has them"),
                Text("Verify the build succeeds"),
                Text("Confirm every acceptance criterion has passing test coverage"),
            ],
            closing: &["Tests and lint are both checked before the completion gate."],
        }),
        StepId::RedGate | StepId::GreenGate => None,
    }
}

// ---------------------------------------------------------------------------
// Project conventions
// ---------------------------------------------------------------------------

/// Test-file naming patterns as `(display, prefix, suffix)`.
const TEST_PATTERNS: &[(&str, &str, &str)] = &[
    ("*.test.ts", "", ".test.ts"),
    ("*.test.tsx", "", ".test.tsx"),
    ("*.test.js", "", ".test.js"),
    ("*.spec.ts", "", ".spec.ts"),
    ("*.spec.js", "", ".spec.js"),
    ("*_test.py", "", "_test.py"),
    ("test_*.py", "test_", ".py"),
    ("*_test.go", "", "_test.go"),
    ("*Tests.cs", "", "Tests.cs"),
    ("*_test.rs", "", "_test.rs"),
];

/// Directories searched recursively. The root itself is searched one level.
const TEST_DIRS: &[&str] = &["src", "test", "tests", "__tests__", "spec", "lib", "app"];

/// Summarize the runner and the test-file conventions observed under `root`.
pub fn detect_conventions(root: &Path, runner: &RunnerInfo) -> String {
    let mut parts = Vec::new();

    if let Some(cmd) = &runner.command {
        let mut line = format!("Test runner: {cmd}");
        if let Some(lint) = &runner.lint {
            line.push_str(&format!(" | Lint: {lint}"));
        }
        parts.push(line);
    }

    let mut patterns = BTreeSet::new();
    let mut dirs = BTreeSet::new();
    for dir in TEST_DIRS {
        let path = root.join(dir);
        if path.is_dir() {
            scan_tests(&path, true, &mut patterns, &mut || {
                dirs.insert((*dir).to_string());
            });
        }
    }
    scan_tests(root, false, &mut patterns, &mut || {});

    if !patterns.is_empty() {
        let list = patterns.into_iter().collect::<Vec<_>>().join(", ");
        if dirs.is_empty() {
            parts.push(format!("Test patterns found: {list}"));
        } else {
            let in_dirs = dirs.into_iter().collect::<Vec<_>>().join(", ");
            parts.push(format!("Test patterns found: {list} (in {in_dirs}/)"));
        }
    }

    if parts.is_empty() {
        "No test runner detected".to_string()
    } else {
        parts.join("\n")
    }
}

fn scan_tests(
    dir: &Path,
    recursive: bool,
    patterns: &mut BTreeSet<&'static str>,
    on_match: &mut dyn FnMut(),
) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if file_type.is_dir() {
            if recursive && !name.starts_with('.') && !SKIP_DIRS.contains(&name.as_ref()) {
                scan_tests(&entry.path(), true, patterns, on_match);
            }
            continue;
        }
        for &(display, prefix, suffix) in TEST_PATTERNS {
            if name.starts_with(prefix) && name.ends_with(suffix) && name.len() > suffix.len() {
                patterns.insert(display);
                on_match();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

pub struct ComposeInput<'a> {
    pub step: StepId,
    pub story_file: &'a str,
    pub prompt: &'a str,
    pub runner: &'a RunnerInfo,
    /// Output of [`detect_conventions`].
    pub conventions: &'a str,
    /// Extensions declared for the step's role.
    pub extensions: &'a [ExtensionDescriptor],
}

/// Directive for the step in `input`. Gates get their gate message.
pub fn compose(input: &ComposeInput<'_>) -> String {
    let def = input.step.definition();
    let (Some(step_brief), Some(role)) = (brief(input.step), def.role) else {
        return gate_message(input.step, input.story_file);
    };

    let mut lines: Vec<String> = vec![step_brief.title.to_string(), String::new()];
    lines.push(role_card(role).to_string());
    lines.push(String::new());

    if step_brief.shows_story && !input.story_file.is_empty() {
        lines.push(format!("Story: {}", input.story_file));
    }
    if !input.conventions.is_empty() {
        lines.push(input.conventions.to_string());
    }
    lines.push(String::new());

    for text in step_brief.preamble {
        lines.push((*text).to_string());
    }
    if !step_brief.preamble.is_empty() {
        lines.push(String::new());
    }

    lines.push("Steps:".to_string());
    for (i, item) in step_brief.checklist.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, render_item(item, input.runner)));
    }

    if step_brief.shows_prompt && !input.prompt.is_empty() {
        lines.push(String::new());
        lines.push(format!("Workflow Context: {}", input.prompt));
    }

    lines.push(String::new());
    lines.push(inline_rules(step_brief.rules).to_string());
    lines.push(String::new());
    lines.push(RETRIEVAL_INSTRUCTION.to_string());

    if !step_brief.closing.is_empty() {
        lines.push(String::new());
        for text in step_brief.closing {
            lines.push((*text).to_string());
        }
    }

    if !input.extensions.is_empty() {
        lines.push(String::new());
        lines.push(
            "Optional extensions for this role (consult one only if it helps; none is required to complete the step):"
                .to_string(),
        );
        for ext in input.extensions {
            if ext.description.is_empty() {
                lines.push(format!("- {}", ext.name));
            } else {
                lines.push(format!("- {}: {}", ext.name, ext.description));
            }
        }
    }

    lines.join("\n")
}

fn render_item(item: &Item, runner: &RunnerInfo) -> String {
    let (with, without, cmd) = match item {
        Item::Text(text) => return (*text).to_string(),
        Item::RunTests { with, without } => (with, without, runner.command.as_deref()),
        Item::RunLint { with, without } => (with, without, runner.lint.as_deref()),
    };
    match cmd {
        Some(cmd) => with.replace("{cmd}", cmd),
        None => (*without).to_string(),
    }
}

/// Banner shown when the workflow parks at a gate.
pub fn gate_message(step: StepId, story_file: &str) -> String {
    let story = if story_file.is_empty() {
        "(not yet created)"
    } else {
        story_file
    };
    let def = step.definition();

    let mut doc = String::new();
    match step {
        StepId::RedGate => {
            doc.push_str("GATE: TDD RED Phase Complete\n\n");
            doc.push_str(&format!("Story file: {story}\n\n"));
            doc.push_str("Tests are failing with assertion errors - RED state confirmed.\n\n");
            doc.push_str("Review before proceeding:\n");
            doc.push_str("- [ ] Each acceptance criterion has test coverage\n");
            doc.push_str("- [ ] Tests fail on assertions (not syntax/import errors)\n");
            doc.push_str("- [ ] Story requirements are clear\n");
        }
        StepId::GreenGate => {
            doc.push_str("GATE: TDD GREEN Phase Complete\n\n");
            doc.push_str(&format!("Story file: {story}\n\n"));
            doc.push_str("All validations passed:\n");
            doc.push_str("- RED: failing tests written\n");
            doc.push_str("- GREEN: all tests passing\n");
            doc.push_str("- VERIFY: tests + lint clean\n\n");
            doc.push_str("Final steps:\n");
            doc.push_str("1. Commit all changes (implementation + tests)\n");
            doc.push_str("2. Mark the story as Done\n");
        }
        other => {
            doc.push_str(&format!("GATE: {other}\n\n"));
            doc.push_str(&format!("Story file: {story}\n"));
        }
    }

    doc.push_str("\nCommands:\n");
    if def.loop_back.is_some() {
        doc.push_str("  redgreen approve  - Proceed to the next phase\n");
        let target = def
            .loop_back
            .and_then(crate::step::step_at)
            .map(|s| s.id.as_str())
            .unwrap_or("the start");
        doc.push_str(&format!("  redgreen reject   - Loop back to {target}\n"));
    } else {
        doc.push_str("  redgreen approve  - Complete the workflow\n");
    }
    doc
}

/// Banner shown when the workflow finishes.
pub fn completion_message(story_file: &str) -> String {
    let story = if story_file.is_empty() {
        "(none recorded)"
    } else {
        story_file
    };
    format!(
        "Workflow COMPLETE\n\n\
         Story file: {story}\n\n\
         TDD cycle complete:\n\
         - RED: failing tests written\n\
         - GREEN: all tests passing\n\
         - VERIFY: tests + lint clean\n\n\
         Final steps:\n\
         1. Commit your changes\n\
         2. Mark the story as Done"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
