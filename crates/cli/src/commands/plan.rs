use anyhow::{Context, Result};
use colored::*;
use runnel_core::task::get_task_color;
use runnel_core::workspace_manager::WorkspaceManager;

pub fn execute(manager: &WorkspaceManager, task: &str) -> Result<()> {
    println!("{} {}", "Execution plan for".bold(), task.cyan());

    // Get execution plan from workspace manager
    let execution_plan = manager
        .get_execution_plan(task)
        .context("Failed to get execution plan")?;

    println!("\n{}:", "Execution order".bold());
    for (i, batch) in execution_plan.batches.iter().enumerate() {
        let names = batch
            .iter()
            .map(|name| name.color(get_task_color(name)).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {}. {}", i + 1, names);
    }

    Ok(())
}
