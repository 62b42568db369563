use crate::error::LoopError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// StepId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    ReviewPreviousNotes,
    DraftStory,
    WriteFailingTests,
    RedGate,
    ImplementTasks,
    VerifyGreenState,
    GreenGate,
}

impl StepId {
    pub fn all() -> &'static [StepId] {
        &[
            StepId::ReviewPreviousNotes,
            StepId::DraftStory,
            StepId::WriteFailingTests,
            StepId::RedGate,
            StepId::ImplementTasks,
            StepId::VerifyGreenState,
            StepId::GreenGate,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepId::ReviewPreviousNotes => "review_previous_notes",
            StepId::DraftStory => "draft_story",
            StepId::WriteFailingTests => "write_failing_tests",
            StepId::RedGate => "red_gate",
            StepId::ImplementTasks => "implement_tasks",
            StepId::VerifyGreenState => "verify_green_state",
            StepId::GreenGate => "green_gate",
        }
    }

    /// Registry row for this step. Every id has exactly one row.
    pub fn index(self) -> usize {
        REGISTRY
            .iter()
            .position(|s| s.id == self)
            .unwrap_or(REGISTRY.len())
    }

    pub fn definition(self) -> &'static StepDefinition {
        &REGISTRY[self.index()]
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepId {
    type Err = LoopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| LoopError::UnknownStep(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The responsibility an agent step is performed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[serde(alias = "sm")]
    Planner,
    #[serde(alias = "qa")]
    TestArchitect,
    #[serde(alias = "dev")]
    Developer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Planner => "planner",
            Role::TestArchitect => "test-architect",
            Role::Developer => "developer",
        }
    }

    /// Short tag used in progress tables.
    pub fn tag(self) -> &'static str {
        match self {
            Role::Planner => "SM",
            Role::TestArchitect => "QA",
            Role::Developer => "DEV",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StepKind / Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Runs automatically; the hook advances past it once validation passes.
    Agent,
    /// Halts until an operator approves or rejects.
    Gate,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepKind::Agent => "agent",
            StepKind::Gate => "gate",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    None,
    /// Tests must fail, on assertions.
    Red,
    /// Tests must pass.
    Green,
    /// Tests and lint must both pass.
    GreenFull,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Validation::None => "none",
            Validation::Red => "red",
            Validation::Green => "green",
            Validation::GreenFull => "green_full",
        })
    }
}

// ---------------------------------------------------------------------------
// StepDefinition / registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: StepId,
    /// `None` for gates, which are operated by a human.
    pub role: Option<Role>,
    pub kind: StepKind,
    /// Registry index a rejection returns to. Only gates define one.
    pub loop_back: Option<usize>,
    pub validation: Validation,
}

impl StepDefinition {
    const fn agent(id: StepId, role: Role, validation: Validation) -> Self {
        Self {
            id,
            role: Some(role),
            kind: StepKind::Agent,
            loop_back: None,
            validation,
        }
    }

    const fn gate(id: StepId, loop_back: Option<usize>) -> Self {
        Self {
            id,
            role: None,
            kind: StepKind::Gate,
            loop_back,
            validation: Validation::None,
        }
    }

    pub fn is_gate(&self) -> bool {
        self.kind == StepKind::Gate
    }
}

/// The core development cycle: planning, RED, gate, GREEN, verification, gate.
pub const REGISTRY: [StepDefinition; 7] = [
    StepDefinition::agent(StepId::ReviewPreviousNotes, Role::Planner, Validation::None),
    StepDefinition::agent(StepId::DraftStory, Role::Planner, Validation::None),
    StepDefinition::agent(StepId::WriteFailingTests, Role::TestArchitect, Validation::Red),
    StepDefinition::gate(StepId::RedGate, Some(0)),
    StepDefinition::agent(StepId::ImplementTasks, Role::Developer, Validation::Green),
    StepDefinition::agent(StepId::VerifyGreenState, Role::TestArchitect, Validation::GreenFull),
    StepDefinition::gate(StepId::GreenGate, None),
];

pub const WORKFLOW_NAME: &str = "core-development-cycle";

/// One-line map of the cycle, shown in status output.
pub const WORKFLOW_INDEX: &str = "Workflow: Planning(SM) -> RED(QA: tests fail) -> RED_GATE -> GREEN(DEV: tests pass) -> VERIFY(QA) -> GREEN_GATE";

/// Look up a registry row. Out-of-range indices mean "workflow complete".
pub fn step_at(index: usize) -> Option<&'static StepDefinition> {
    REGISTRY.get(index)
}

pub fn step_count() -> usize {
    REGISTRY.len()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
