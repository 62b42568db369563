use super::Services;
use crate::output::print_json;
use redgreen_core::engine::Cancelled;
use serde_json::json;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let services = Services::lenient(root);
    let cancelled = services.engine().cancel()?;

    if json {
        let value = match &cancelled {
            Cancelled::Stopped { index, step } => json!({
                "cancelled": true,
                "step": step,
                "step_number": index.saturating_add(1),
            }),
            Cancelled::Unreadable => json!({ "cancelled": true, "unreadable": true }),
            Cancelled::NothingActive => json!({ "cancelled": false }),
        };
        return print_json(&value);
    }

    match cancelled {
        Cancelled::Stopped { index, step } => {
            println!("Workflow CANCELLED");
            println!("Stopped at step {}: {step}", index.saturating_add(1));
        }
        Cancelled::Unreadable => {
            println!("Workflow CANCELLED");
            println!("Removed an unreadable state file.");
        }
        Cancelled::NothingActive => println!("No active workflow found."),
    }
    Ok(())
}
