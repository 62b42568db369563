//! Trigger entry points called by the agent host.
//!
//! Neither command ever fails the host: every error is logged on stderr and
//! the process exits 0 with nothing on stdout.

use super::Services;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// The fields of the host's hook payload that matter here.
#[derive(Debug, Default, Deserialize)]
struct HookPayload {
    #[serde(default)]
    session_id: Option<String>,
}

fn read_payload() -> Option<HookPayload> {
    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        tracing::warn!(error = %e, "could not read hook payload");
        return None;
    }
    match serde_json::from_str(&raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::debug!(error = %e, "hook payload is not JSON, ignoring");
            None
        }
    }
}

/// End-of-turn trigger: validate the current step and print the hook
/// protocol response, if any.
pub fn run(root: &Path, tool_command: Option<&str>, file_path: Option<&str>) {
    let Some(payload) = read_payload() else {
        return;
    };
    let session = payload.session_id.unwrap_or_default();
    tracing::debug!(
        session = %session,
        tool_command = tool_command.unwrap_or(""),
        file_path = file_path.unwrap_or(""),
        "hook triggered"
    );

    let services = Services::lenient(root);
    let outcome = match services.engine().advance(&session) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "hook failed");
            return;
        }
    };
    if let Some(response) = outcome.hook_payload() {
        println!("{response}");
    }
}

/// Post-write trigger: record `file_path` as the workflow's story when it is
/// one.
pub fn track_story(root: &Path, file_path: Option<&str>, session_id: Option<&str>) {
    let Some(file_path) = file_path.filter(|p| !p.is_empty()) else {
        return;
    };
    let session = match session_id {
        Some(id) => id.to_string(),
        None => match read_payload() {
            Some(payload) => payload.session_id.unwrap_or_default(),
            None => return,
        },
    };

    let services = Services::lenient(root);
    match services.engine().track_story(&session, file_path) {
        Ok(Some(recorded)) => tracing::debug!(story = %recorded, "story tracked"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "track-story failed"),
    }
}
