use anyhow::{Context, Result};
use colored::*;
use runnel_core::execution::TaskRunnerConfig;
use runnel_core::results::{RunResult, TaskStatus};
use runnel_core::workspace_manager::WorkspaceManager;

pub async fn execute(manager: &WorkspaceManager, task: Option<&str>) -> Result<()> {
    let task = task.unwrap_or_else(|| manager.default_task());
    println!("{} {}", "Running task".bold(), task.cyan());
    println!();

    // Execute task using workspace manager
    let result = manager
        .run_task(task, TaskRunnerConfig { print_progress: true })
        .await
        .context("Failed to run task")?;

    println!();
    print_summary(&result);
    result.into_result()?;
    Ok(())
}

/// One-line summary of a finished run
pub fn print_summary(result: &RunResult) {
    if result.is_success() {
        println!(
            "{} {} {}",
            "✓".green().bold(),
            "All tasks completed successfully!".green().bold(),
            format!("({} ms)", result.duration.as_millis()).dimmed()
        );
        return;
    }

    println!(
        "{} {} succeeded, {} failed, {} skipped, {} cancelled",
        "✗".red().bold(),
        result.count(TaskStatus::Succeeded),
        result.count(TaskStatus::Failed).to_string().red().bold(),
        result.count(TaskStatus::Skipped),
        result.count(TaskStatus::Cancelled)
    );
}
