use super::Services;
use crate::output::print_json;
use redgreen_core::state::WorkflowStateRepository;
use redgreen_core::status;
use serde_json::json;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let services = Services::lenient(root);
    let Some(state) = services.repo.load() else {
        if json {
            return print_json(&json!({ "active": false }));
        }
        if services.repo.exists() {
            println!("State file is unreadable: {}", services.repo.path().display());
            println!("Run 'redgreen cancel' to discard it.");
        } else {
            println!("No active workflow.");
            println!("Start one with: redgreen setup \"<what to build>\"");
        }
        return Ok(());
    };

    let report = status::report(&state, chrono::Utc::now(), services.config.stale_after());
    if json {
        print_json(&report)
    } else {
        print!("{}", report.render(services.config.stale_after_hours));
        Ok(())
    }
}
