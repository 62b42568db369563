use super::{print_outcome, Services};
use redgreen_core::engine::Outcome;
use redgreen_core::state::WorkflowStateRepository;
use std::path::Path;

/// Sign off the gate the workflow is parked at.
pub fn approve(root: &Path, json: bool) -> anyhow::Result<()> {
    let services = Services::load(root)?;
    let gate = current_step(&services.repo);
    let outcome = services.engine().approve()?;

    if !json {
        match &outcome {
            Outcome::Complete(_) => println!("APPROVED {gate}. Workflow COMPLETE.\n"),
            _ => println!("APPROVED {gate}. Continuing.\n"),
        }
    }
    print_outcome(&outcome, &services.repo, json)
}

/// Send the workflow back to the gate's loop-back step.
pub fn reject(root: &Path, json: bool) -> anyhow::Result<()> {
    let services = Services::load(root)?;
    let gate = current_step(&services.repo);
    let outcome = services.engine().reject()?;

    if !json {
        let target = current_step(&services.repo);
        println!("REJECTED at {gate}. Looping back to: {target}\n");
    }
    print_outcome(&outcome, &services.repo, json)
}

fn current_step(repo: &dyn WorkflowStateRepository) -> String {
    repo.load().map(|s| s.current_step).unwrap_or_default()
}
