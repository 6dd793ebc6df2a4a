use anyhow::Result;
use colored::*;
use runnel_core::task::get_task_color;
use runnel_core::types::RunnelError;
use runnel_core::workspace_manager::WorkspaceManager;

pub fn execute(manager: &WorkspaceManager) -> Result<()> {
    println!("{}", "Task Dependency Graph:".bold().underline());

    let result = manager.get_dependency_graph();
    let graph = &result.graph;

    if graph.node_count() == 0 {
        println!("No tasks registered");
        return Ok(());
    }

    for cycle in &result.cycles {
        let warning = RunnelError::Cycle(cycle.clone()).to_string();
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    for node_index in graph.node_indices() {
        let name = &graph[node_index];
        println!("{}", name.color(get_task_color(name)).bold());

        // Edges point from a task to its dependencies; petgraph yields them newest first
        let mut deps: Vec<&str> = graph
            .neighbors(node_index)
            .map(|neighbor| graph[neighbor].as_str())
            .collect();
        deps.reverse();

        if !deps.is_empty() {
            println!("  {} {}", "depends on:".dimmed(), deps.join(", "));
        } else {
            println!("  {}", "no dependencies".dimmed());
        }
        println!();
    }

    Ok(())
}
