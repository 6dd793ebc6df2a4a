//! Task dependency management
//!
//! This module resolves requested tasks into an [`ExecutionPlan`]: a
//! depth-first walk over dependent → dependency edges with three-color
//! marking for cycle detection, followed by grouping into dependency levels
//! for parallel execution.

use std::collections::HashMap;

use crate::execution::plan::ExecutionPlan;
use crate::registry::TaskGraph;
use crate::types::{RunnelError, RunnelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

struct Resolver<'a> {
    graph: &'a TaskGraph,
    marks: HashMap<&'a str, Mark>,
    levels: HashMap<&'a str, usize>,
    path: Vec<&'a str>,
}

impl<'a> Resolver<'a> {
    fn new(graph: &'a TaskGraph) -> Self {
        Self {
            graph,
            marks: HashMap::new(),
            levels: HashMap::new(),
            path: Vec::new(),
        }
    }

    /// Visit `name` and return its dependency level: 0 without
    /// dependencies, otherwise one more than its deepest dependency.
    fn visit(&mut self, name: &'a str) -> RunnelResult<usize> {
        match self.marks.get(name) {
            Some(Mark::Done) => return Ok(self.levels.get(name).copied().unwrap_or_default()),
            Some(Mark::InProgress) => {
                let start = self.path.iter().position(|n| *n == name).unwrap_or(0);
                let cycle = self.path[start..].iter().map(|n| n.to_string()).collect();
                return Err(RunnelError::Cycle(cycle));
            }
            None => {}
        }

        let graph = self.graph;
        let task = graph.lookup(name)?;

        self.marks.insert(name, Mark::InProgress);
        self.path.push(name);

        let mut level = 0;
        for dep in &task.dependencies {
            if !graph.contains(dep) {
                return Err(RunnelError::UnknownDependency {
                    task: name.to_string(),
                    dependency: dep.clone(),
                });
            }
            level = level.max(self.visit(dep)? + 1);
        }

        self.path.pop();
        self.marks.insert(name, Mark::Done);
        self.levels.insert(name, level);
        Ok(level)
    }
}

/// Resolve the requested tasks and everything they transitively depend on
/// into a batched plan.
///
/// Within a batch, tasks are ordered by registration order so plans are
/// deterministic.
pub fn resolve_execution_plan(
    graph: &TaskGraph,
    requested: &[String],
) -> RunnelResult<ExecutionPlan> {
    let mut resolver = Resolver::new(graph);
    for name in requested {
        resolver.visit(name)?;
    }

    let plan = ExecutionPlan {
        requested: dedup_preserving_order(requested),
        batches: group_by_dependency_levels(graph, &resolver.levels),
    };

    tracing::debug!(
        requested = ?plan.requested,
        batches = plan.batches.len(),
        tasks = plan.task_count(),
        "resolved execution plan"
    );
    Ok(plan)
}

/// Group tasks by their dependency levels (topological levels), each level
/// sorted by registration order
fn group_by_dependency_levels(
    graph: &TaskGraph,
    levels: &HashMap<&str, usize>,
) -> Vec<Vec<String>> {
    let depth = levels.values().max().map_or(0, |max| max + 1);
    let mut batches: Vec<Vec<&str>> = vec![Vec::new(); depth];
    for (name, level) in levels {
        batches[*level].push(name);
    }

    batches
        .into_iter()
        .map(|mut batch| {
            batch.sort_by_key(|name| graph.registration_index(name).unwrap_or(usize::MAX));
            batch.into_iter().map(str::to_string).collect()
        })
        .collect()
}

fn dedup_preserving_order(names: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains(name) {
            seen.push(name.clone());
        }
    }
    seen
}
