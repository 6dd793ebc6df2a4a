//! Execution plans
//!
//! A plan is an ordered list of batches. Tasks inside a batch do not depend
//! on each other and may run concurrently; every task sits in a later batch
//! than all of its dependencies.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Task names the plan was resolved for
    pub requested: Vec<String>,
    pub batches: Vec<Vec<String>>,
}

impl ExecutionPlan {
    /// Number of tasks across all batches
    pub fn task_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Tasks in execution order, batch by batch
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.batches.iter().flatten().map(String::as_str)
    }

    /// Index of the batch that contains `task`
    pub fn batch_of(&self, task: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|name| name == task))
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, batch) in self.batches.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, batch.join(", "))?;
        }
        Ok(())
    }
}
