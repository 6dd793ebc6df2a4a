use anyhow::Result;
use colored::*;
use runnel_core::workspace_manager::WorkspaceManager;

pub fn execute(manager: &WorkspaceManager) -> Result<()> {
    let result = manager.list_tasks();

    let heading = match &result.workspace_name {
        Some(name) => format!("Tasks in {}", name),
        None => "Tasks".to_string(),
    };
    println!("{}", heading.bold().underline());

    if result.tasks.is_empty() {
        println!("  {}", "No tasks found".dimmed());
        return Ok(());
    }

    let width = result
        .tasks
        .iter()
        .map(|task| task.name.len())
        .max()
        .unwrap_or(0);

    for task in &result.tasks {
        let marker = if task.name == result.default_task {
            " (default)".green().to_string()
        } else {
            String::new()
        };
        let description = task.description.as_deref().unwrap_or("");
        println!(
            "  {}  {}{}",
            format!("{:width$}", task.name, width = width).blue().bold(),
            description.dimmed(),
            marker
        );
        if !task.dependencies.is_empty() {
            println!(
                "  {:width$}  {} {}",
                "",
                "depends on:".dimmed(),
                task.dependencies.join(", "),
                width = width
            );
        }
    }

    Ok(())
}
