//! Persisted workflow state.
//!
//! The state lives in a single Markdown file: a `---`-delimited YAML
//! frontmatter block that is the machine-readable contract, followed by a
//! human-readable body that is regenerated on every write. Absence of the file
//! is the "no workflow" state.

use crate::error::Result;
use crate::io::{atomic_write, remove_if_exists, split_frontmatter};
use crate::paths;
use crate::step::{self, StepDefinition, StepId, REGISTRY, WORKFLOW_NAME};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub active: bool,
    /// Denormalized copy of the current step id, for display and logging.
    pub current_step: String,
    /// Authoritative position in the step registry.
    pub current_step_index: usize,
    /// Registry rows before this index were skipped at setup.
    pub start_step_index: usize,
    pub story_file: String,
    /// True exactly while the workflow is parked at a gate.
    pub paused_for_manual: bool,
    pub prompt: String,
    pub started_at: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    /// `last_activity` was present in the file but not a timestamp.
    pub last_activity_unreadable: bool,
    pub session_id: String,
}

impl WorkflowState {
    pub fn new(
        prompt: impl Into<String>,
        session_id: impl Into<String>,
        start: StepId,
        now: DateTime<Utc>,
    ) -> Self {
        let index = start.index();
        Self {
            active: true,
            current_step: start.as_str().to_string(),
            current_step_index: index,
            start_step_index: index,
            story_file: String::new(),
            paused_for_manual: start.definition().is_gate(),
            prompt: prompt.into(),
            started_at: Some(now),
            last_activity: None,
            last_activity_unreadable: false,
            session_id: session_id.into(),
        }
    }

    pub fn current(&self) -> Option<&'static StepDefinition> {
        step::step_at(self.current_step_index)
    }

    /// Reposition at `index`, keeping the pause flag in lockstep with the
    /// kind of the target step.
    pub fn move_to(&mut self, index: usize, now: DateTime<Utc>) {
        self.current_step_index = index;
        if let Some(def) = step::step_at(index) {
            self.current_step = def.id.as_str().to_string();
            self.paused_for_manual = def.is_gate();
        }
        self.start_step_index = self.start_step_index.min(index);
        self.touch(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = Some(now);
        self.last_activity_unreadable = false;
    }

    /// Most recent recorded activity, falling back to the start time only
    /// when no activity was recorded. A corrupt activity stamp yields `None`.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        if self.last_activity_unreadable {
            return None;
        }
        self.last_activity.or(self.started_at)
    }

    pub fn story_display(&self) -> &str {
        if self.story_file.is_empty() {
            "(not yet created)"
        } else {
            &self.story_file
        }
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Parse the state file. Returns `None` when the frontmatter block is
    /// missing or is not a YAML mapping. Missing keys take their defaults and
    /// values may be quoted.
    pub fn parse(content: &str) -> Option<Self> {
        let (fm, _body) = split_frontmatter(content)?;
        let map: Mapping = if fm.trim().is_empty() {
            Mapping::new()
        } else {
            serde_yaml::from_str(fm).ok()?
        };

        let current_step_index = get_usize(&map, "current_step_index").unwrap_or(0);
        let raw_activity = get_string(&map, "last_activity");
        let last_activity = parse_timestamp(&raw_activity);
        Some(Self {
            active: get_bool(&map, "active"),
            current_step: get_string(&map, "current_step"),
            current_step_index,
            start_step_index: get_usize(&map, "start_step_index")
                .unwrap_or(0)
                .min(current_step_index),
            story_file: get_string(&map, "story_file"),
            paused_for_manual: get_bool(&map, "paused_for_manual"),
            prompt: get_string(&map, "prompt"),
            started_at: parse_timestamp(&get_string(&map, "started_at")),
            last_activity,
            last_activity_unreadable: last_activity.is_none() && !raw_activity.trim().is_empty(),
            session_id: get_string(&map, "session_id"),
        })
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    pub fn render(&self) -> Result<String> {
        let fm = Frontmatter {
            active: self.active,
            workflow: WORKFLOW_NAME,
            current_step: &self.current_step,
            current_step_index: self.current_step_index,
            start_step_index: self.start_step_index,
            total_steps: REGISTRY.len(),
            story_file: &self.story_file,
            paused_for_manual: self.paused_for_manual,
            prompt: &self.prompt,
            started_at: self.started_at.map(|t| t.to_rfc3339()),
            last_activity: self.last_activity.map(|t| t.to_rfc3339()),
            session_id: &self.session_id,
        };
        let yaml = serde_yaml::to_string(&fm)?;

        let mut doc = String::new();
        doc.push_str("---\n");
        doc.push_str(&yaml);
        doc.push_str("---\n\n");
        doc.push_str("# Red/Green Workflow Loop\n\n");
        doc.push_str("Test-driven orchestration of the core development cycle.\n");
        doc.push_str("Agent steps advance only when their test gate is met; gates wait for an operator.\n\n");
        doc.push_str("## Workflow Progress\n\n");
        doc.push_str("| Step | Status |\n");
        doc.push_str("|------|--------|\n");
        for (i, def) in REGISTRY.iter().enumerate() {
            doc.push_str(&format!("| {} | {} |\n", def.id, self.row_status(i)));
        }
        doc.push_str("\n## Commands\n\n");
        doc.push_str("- `redgreen approve` - approve the current gate and continue\n");
        doc.push_str("- `redgreen reject` - reject at red_gate and loop back to planning\n");
        doc.push_str("- `redgreen status` - show workflow progress\n");
        doc.push_str("- `redgreen cancel` - stop the workflow and delete this file\n");
        Ok(doc)
    }

    /// Progress label for registry row `i`.
    pub fn row_status(&self, i: usize) -> RowStatus {
        if i == self.current_step_index {
            RowStatus::Current
        } else if i < self.start_step_index {
            RowStatus::Skipped
        } else if i < self.current_step_index {
            RowStatus::Done
        } else {
            RowStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Done,
    Current,
    Pending,
    Skipped,
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RowStatus::Done => "done",
            RowStatus::Current => "current",
            RowStatus::Pending => "pending",
            RowStatus::Skipped => "skipped",
        })
    }
}

#[derive(Serialize)]
struct Frontmatter<'a> {
    active: bool,
    workflow: &'a str,
    current_step: &'a str,
    current_step_index: usize,
    start_step_index: usize,
    total_steps: usize,
    story_file: &'a str,
    paused_for_manual: bool,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_activity: Option<String>,
    session_id: &'a str,
}

// ---------------------------------------------------------------------------
// Lenient field extraction
// ---------------------------------------------------------------------------

fn get_string(map: &Mapping, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn get_bool(map: &Mapping, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn get_usize(map: &Mapping, key: &str) -> Option<usize> {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| usize::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts RFC 3339 and naive ISO-8601 timestamps; naive values are taken as
/// local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Storage for the single workflow state. Implementations never surface
/// structural problems from `load`: an unreadable or malformed record is
/// reported as absent.
pub trait WorkflowStateRepository {
    fn load(&self) -> Option<WorkflowState>;
    fn save(&self, state: &WorkflowState) -> Result<()>;
    /// Returns true if a record was removed.
    fn delete(&self) -> Result<bool>;
    /// True when a record is present, parseable or not.
    fn exists(&self) -> bool;
}

/// The on-disk state file under `.claude/`.
pub struct FileStateRepository {
    path: PathBuf,
}

impl FileStateRepository {
    pub fn new(root: &Path) -> Self {
        Self {
            path: paths::state_path(root),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkflowStateRepository for FileStateRepository {
    fn load(&self) -> Option<WorkflowState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "state file unreadable");
                return None;
            }
        };
        let state = WorkflowState::parse(&content);
        if state.is_none() {
            tracing::warn!(path = %self.path.display(), "state file has no usable frontmatter");
        }
        state
    }

    fn save(&self, state: &WorkflowState) -> Result<()> {
        let doc = state.render()?;
        atomic_write(&self.path, doc.as_bytes())
    }

    fn delete(&self) -> Result<bool> {
        remove_if_exists(&self.path)
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// In-memory repository holding the rendered document, so the same
/// parse/render path as the file store is exercised.
#[derive(Default)]
pub struct MemoryStateRepository {
    doc: RefCell<Option<String>>,
}

impl MemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(doc: impl Into<String>) -> Self {
        Self {
            doc: RefCell::new(Some(doc.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.doc.borrow().clone()
    }
}

impl WorkflowStateRepository for MemoryStateRepository {
    fn load(&self) -> Option<WorkflowState> {
        self.doc.borrow().as_deref().and_then(WorkflowState::parse)
    }

    fn save(&self, state: &WorkflowState) -> Result<()> {
        *self.doc.borrow_mut() = Some(state.render()?);
        Ok(())
    }

    fn delete(&self) -> Result<bool> {
        Ok(self.doc.borrow_mut().take().is_some())
    }

    fn exists(&self) -> bool {
        self.doc.borrow().is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
