use crate::session;
use crate::state::{RowStatus, WorkflowState};
use crate::step::{Role, StepKind, REGISTRY, WORKFLOW_INDEX, WORKFLOW_NAME};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StepRow {
    /// One-based position, as shown to operators.
    pub number: usize,
    pub id: &'static str,
    pub role: Option<Role>,
    pub kind: StepKind,
    pub status: RowStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub workflow: &'static str,
    pub active: bool,
    pub current_step: String,
    pub current_step_index: usize,
    pub total_steps: usize,
    pub story_file: String,
    pub paused_for_manual: bool,
    pub prompt: String,
    pub session_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub stale: bool,
    pub steps: Vec<StepRow>,
    /// Operator commands that apply right now.
    pub actions: Vec<String>,
}

pub fn report(state: &WorkflowState, now: DateTime<Utc>, stale_after: Duration) -> StatusReport {
    let steps = REGISTRY
        .iter()
        .enumerate()
        .map(|(i, def)| StepRow {
            number: i + 1,
            id: def.id.as_str(),
            role: def.role,
            kind: def.kind,
            status: state.row_status(i),
        })
        .collect();

    let mut actions = Vec::new();
    if state.paused_for_manual {
        actions.push("redgreen approve".to_string());
        if state.current().and_then(|d| d.loop_back).is_some() {
            actions.push("redgreen reject".to_string());
        }
    }
    actions.push("redgreen cancel".to_string());

    StatusReport {
        workflow: WORKFLOW_NAME,
        active: state.active,
        current_step: state.current_step.clone(),
        current_step_index: state.current_step_index,
        total_steps: REGISTRY.len(),
        story_file: state.story_file.clone(),
        paused_for_manual: state.paused_for_manual,
        prompt: state.prompt.clone(),
        session_id: state.session_id.clone(),
        started_at: state.started_at,
        last_activity: state.last_activity,
        stale: session::is_stale(state, now, stale_after),
        steps,
        actions,
    }
}

impl StatusReport {
    pub fn render(&self, stale_after_hours: u32) -> String {
        let rule = "-".repeat(50);
        let mut out = String::new();
        out.push_str("Red/Green Workflow Status\n");
        out.push_str(&"=".repeat(50));
        out.push('\n');
        out.push_str(&format!("Started: {}\n", fmt_time(self.started_at)));
        out.push_str(&format!("Last activity: {}\n", fmt_time(self.last_activity)));
        let story = if self.story_file.is_empty() {
            "(not yet created)"
        } else {
            &self.story_file
        };
        out.push_str(&format!("Story: {story}\n"));
        if !self.prompt.is_empty() {
            out.push_str(&format!("Prompt: {}\n", self.prompt));
        }
        let paused = if self.paused_for_manual {
            "Yes - waiting for manual action"
        } else {
            "No"
        };
        out.push_str(&format!("Paused: {paused}\n"));
        if !self.active {
            out.push_str("Note: workflow is marked inactive; the hook ignores it\n");
        }
        if self.stale {
            out.push_str(&format!(
                "Note: no activity for over {stale_after_hours}h. The hook will not advance this \
                 workflow; approve/reject still apply, or cancel to discard it.\n"
            ));
        }

        out.push('\n');
        out.push_str(WORKFLOW_INDEX);
        out.push_str("\n\nProgress:\n");
        out.push_str(&rule);
        out.push('\n');
        for row in &self.steps {
            let marker = match row.status {
                RowStatus::Done => "  DONE",
                RowStatus::Current => ">>> CURRENT",
                RowStatus::Pending => "  pending",
                RowStatus::Skipped => "  skipped",
            };
            let role = row
                .role
                .map(|r| format!(" [{}]", r.tag()))
                .unwrap_or_default();
            out.push_str(&format!(
                "{marker:12} {:2}. {}{role} ({})\n",
                row.number, row.id, row.kind
            ));
        }
        out.push_str(&rule);
        out.push('\n');

        if self.paused_for_manual {
            out.push('\n');
            if self.actions.iter().any(|a| a == "redgreen reject") {
                out.push_str("Action: redgreen approve to proceed, or redgreen reject to loop back\n");
            } else {
                out.push_str("Action: redgreen approve to continue\n");
            }
        }
        out
    }
}

fn fmt_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "(unknown)".to_string())
}
