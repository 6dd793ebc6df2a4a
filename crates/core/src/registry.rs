//! Task registry
//!
//! [`TaskGraph`] stores tasks by name and remembers registration order, which
//! the resolver uses as its tie-break and listings use for display order.
//! Dependencies may name tasks that are registered later; they are checked
//! when a plan is resolved or when [`TaskGraph::validate`] is called.

use std::collections::HashMap;

use petgraph::algo::kosaraju_scc;
use petgraph::prelude::*;

use crate::execution::dependencies::resolve_execution_plan;
use crate::task::Task;
use crate::types::{RunnelError, RunnelResult};

#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Fails without modifying the graph if the name is taken.
    pub fn register(&mut self, task: Task) -> RunnelResult<()> {
        if self.index.contains_key(&task.name) {
            return Err(RunnelError::DuplicateTask(task.name));
        }
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> RunnelResult<&Task> {
        self.index
            .get(name)
            .map(|&i| &self.tasks[i])
            .ok_or_else(|| RunnelError::TaskNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of the task in registration order.
    pub fn registration_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// All non-internal tasks in registration order
    pub fn list_visible(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|task| !task.internal).collect()
    }

    /// All tasks in registration order, internal ones included
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check the whole graph: every dependency is registered and nothing
    /// depends on itself.
    pub fn validate(&self) -> RunnelResult<()> {
        let all: Vec<String> = self.tasks.iter().map(|t| t.name.clone()).collect();
        resolve_execution_plan(self, &all).map(|_| ())
    }

    /// Build a petgraph view of the registry: one node per task, one edge
    /// from each task to each of its dependencies. Unknown dependencies are
    /// left out.
    pub fn to_graph(&self) -> DiGraph<String, ()> {
        let mut graph = DiGraph::<String, ()>::new();
        let mut node_indices = HashMap::new();

        for task in &self.tasks {
            let node_index = graph.add_node(task.name.clone());
            node_indices.insert(task.name.as_str(), node_index);
        }

        for task in &self.tasks {
            let from_node = node_indices[task.name.as_str()];
            for dep in &task.dependencies {
                if let Some(&to_node) = node_indices.get(dep.as_str()) {
                    graph.add_edge(from_node, to_node, ());
                }
            }
        }

        graph
    }

    /// Every cycle in the registry, as sorted member lists.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let graph = self.to_graph();
        let mut cycles: Vec<Vec<String>> = kosaraju_scc(&graph)
            .into_iter()
            .filter_map(|component| {
                if component.len() > 1 {
                    let mut cycle = component
                        .iter()
                        .map(|node| graph[*node].clone())
                        .collect::<Vec<_>>();
                    cycle.sort();
                    Some(cycle)
                } else {
                    let node = component[0];
                    if graph.contains_edge(node, node) {
                        Some(vec![graph[node].clone()])
                    } else {
                        None
                    }
                }
            })
            .collect();

        cycles.sort();
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Task {
        Task::aggregate(name, Vec::new())
    }

    #[test]
    fn test_duplicate_registration_leaves_registry_unchanged() {
        let mut graph = TaskGraph::new();
        graph
            .register(noop("style").with_description("first"))
            .unwrap();

        let err = graph
            .register(noop("style").with_description("second"))
            .expect_err("duplicate names must be rejected");
        assert!(matches!(err, RunnelError::DuplicateTask(name) if name == "style"));

        assert_eq!(graph.len(), 1);
        assert_eq!(
            graph.lookup("style").unwrap().description.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_lookup_missing_task() {
        let graph = TaskGraph::new();
        let err = graph.lookup("nope").unwrap_err();
        assert!(matches!(err, RunnelError::TaskNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_dependencies_may_be_registered_later() {
        let mut graph = TaskGraph::new();
        graph
            .register(Task::aggregate("default", vec!["clean".to_string()]))
            .unwrap();
        graph.register(noop("clean")).unwrap();
        graph.validate().expect("forward references resolve once registered");
    }

    #[test]
    fn test_validate_reports_unknown_dependency() {
        let mut graph = TaskGraph::new();
        graph
            .register(Task::aggregate("watch", vec!["lint:json".to_string()]))
            .unwrap();

        let err = graph.validate().unwrap_err();
        assert!(matches!(
            err,
            RunnelError::UnknownDependency { task, dependency }
                if task == "watch" && dependency == "lint:json"
        ));
    }

    #[test]
    fn test_list_visible_hides_internal_tasks() {
        let mut graph = TaskGraph::new();
        graph.register(noop("server")).unwrap();
        graph.register(noop("--rerun").internal(true)).unwrap();
        graph.register(noop("lint")).unwrap();

        let visible: Vec<&str> = graph
            .list_visible()
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(visible, vec!["server", "lint"]);
        assert_eq!(graph.tasks().len(), 3);
    }

    #[test]
    fn test_cycles_are_listed() {
        let mut graph = TaskGraph::new();
        graph
            .register(Task::aggregate("a", vec!["b".to_string()]))
            .unwrap();
        graph
            .register(Task::aggregate("b", vec!["a".to_string()]))
            .unwrap();
        graph
            .register(Task::aggregate("c", vec!["c".to_string()]))
            .unwrap();
        graph.register(noop("d")).unwrap();

        assert_eq!(
            graph.cycles(),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string()]
            ]
        );
        assert_eq!(graph.to_graph().edge_count(), 3);
    }
}
