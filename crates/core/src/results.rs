//! Result types for workspace operations
//!
//! This module contains the result types returned by the runner and the
//! workspace manager, providing a centralized location for output structures.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{RunnelError, RunnelResult};

/// Final state of a task in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed,
    /// Not run because a dependency failed or was itself skipped
    Skipped,
    /// Not run because the run was cancelled before its batch started
    Cancelled,
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Succeeded)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Outcome of a single task
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub name: String,
    pub status: TaskStatus,
    pub artifacts: Vec<PathBuf>,
    /// Failure message, or the reason the task was skipped
    pub error: Option<String>,
    pub duration: Duration,
}

impl TaskReport {
    pub fn succeeded(name: impl Into<String>, artifacts: Vec<PathBuf>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Succeeded,
            artifacts,
            error: None,
            duration,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Failed,
            artifacts: Vec::new(),
            error: Some(error.into()),
            duration,
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Skipped,
            artifacts: Vec::new(),
            error: Some(reason.into()),
            duration: Duration::ZERO,
        }
    }

    pub fn cancelled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TaskStatus::Cancelled,
            artifacts: Vec::new(),
            error: None,
            duration: Duration::ZERO,
        }
    }
}

/// Outcome of executing a plan
#[derive(Debug, Clone)]
pub struct RunResult {
    pub requested: Vec<String>,
    /// One report per planned task, in plan order
    pub reports: Vec<TaskReport>,
    pub duration: Duration,
}

impl RunResult {
    /// True only when every planned task succeeded
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(|report| report.status.is_success())
    }

    pub fn report(&self, name: &str) -> Option<&TaskReport> {
        self.reports.iter().find(|report| report.name == name)
    }

    pub fn status_of(&self, name: &str) -> Option<TaskStatus> {
        self.report(name).map(|report| report.status)
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.reports
            .iter()
            .filter(|report| report.status == status)
            .count()
    }

    /// Convert a failed run into [`RunnelError::TaskFailed`]
    pub fn into_result(self) -> RunnelResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(RunnelError::TaskFailed {
            failed: self.count(TaskStatus::Failed),
            skipped: self.count(TaskStatus::Skipped) + self.count(TaskStatus::Cancelled),
        })
    }
}

/// A task as shown by listings
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: String,
    pub description: Option<String>,
    pub dependencies: Vec<String>,
}

/// Result of listing the visible tasks
#[derive(Debug)]
pub struct TaskListResult {
    pub workspace_name: Option<String>,
    pub default_task: String,
    pub tasks: Vec<TaskInfo>,
}

/// Result of getting the dependency graph
#[derive(Debug)]
pub struct DependencyGraphResult {
    pub graph: petgraph::Graph<String, ()>,
    pub cycles: Vec<Vec<String>>,
}
