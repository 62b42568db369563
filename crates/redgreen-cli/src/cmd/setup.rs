use super::{print_outcome, Services};
use redgreen_core::step::StepId;
use std::path::Path;

pub fn run(root: &Path, prompt: &str, session_id: &str, start: StepId, json: bool) -> anyhow::Result<()> {
    let services = Services::load(root)?;
    let outcome = services.engine().setup(prompt, session_id, start)?;

    if session_id.is_empty() {
        eprintln!(
            "warning: no session id (set CLAUDE_SESSION_ID or pass --session-id); \
             the hook will not advance this workflow"
        );
    }

    if !json {
        println!("Workflow started at {start}");
        println!("State: {}", services.repo.path().display());
        println!();
    }
    print_outcome(&outcome, &services.repo, json)
}
