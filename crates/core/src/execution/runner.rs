//! High-level task runner
//!
//! This module executes an [`ExecutionPlan`] batch by batch. Members of a
//! batch run concurrently on blocking threads; the next batch starts only
//! once every member of the current one has settled.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use tokio::task::JoinSet;

use crate::execution::plan::ExecutionPlan;
use crate::registry::TaskGraph;
use crate::results::{RunResult, TaskReport, TaskStatus};
use crate::task::{get_task_color, WorkOutput};

/// Cooperative cancellation shared between a run and whoever may stop it.
///
/// The runner only looks at the flag between batches: a batch that has
/// started always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration for the task runner
#[derive(Debug, Clone, Default)]
pub struct TaskRunnerConfig {
    /// Print per-task progress to stdout
    pub print_progress: bool,
}

/// Runs execution plans against a task graph
pub struct TaskRunner<'a> {
    graph: &'a TaskGraph,
    config: TaskRunnerConfig,
}

type WorkOutcome = (String, Result<WorkOutput, String>, Duration);

impl<'a> TaskRunner<'a> {
    pub fn new(graph: &'a TaskGraph) -> Self {
        Self::with_config(graph, TaskRunnerConfig::default())
    }

    pub fn with_config(graph: &'a TaskGraph, config: TaskRunnerConfig) -> Self {
        Self { graph, config }
    }

    /// Run every batch of the plan
    pub async fn run(&self, plan: &ExecutionPlan) -> RunResult {
        self.run_with_cancellation(plan, &CancellationFlag::new())
            .await
    }

    /// Run the plan, dropping batches that have not started once `cancel`
    /// is set
    pub async fn run_with_cancellation(
        &self,
        plan: &ExecutionPlan,
        cancel: &CancellationFlag,
    ) -> RunResult {
        let started = Instant::now();
        let mut reports: HashMap<String, TaskReport> = HashMap::new();

        for (level, batch) in plan.batches.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::debug!(level, "run cancelled, dropping batch");
                for name in batch {
                    reports.insert(name.clone(), TaskReport::cancelled(name));
                }
                continue;
            }

            tracing::debug!(level, tasks = ?batch, "starting batch");
            let mut join_set = JoinSet::new();

            for name in batch {
                if let Some(report) = self.blocked_report(name, &reports) {
                    self.print_report(&report);
                    reports.insert(name.clone(), report);
                    continue;
                }

                let task = match self.graph.lookup(name) {
                    Ok(task) => task,
                    Err(e) => {
                        let report = TaskReport::failed(name, e.to_string(), Duration::ZERO);
                        self.print_report(&report);
                        reports.insert(name.clone(), report);
                        continue;
                    }
                };

                self.print_header(name);
                tracing::info!(task = %name, "running task");

                let work = Arc::clone(&task.work);
                let name = name.clone();
                join_set.spawn_blocking(move || -> WorkOutcome {
                    let start = Instant::now();
                    let outcome = match catch_unwind(AssertUnwindSafe(|| work.run())) {
                        Ok(Ok(output)) => Ok(output),
                        Ok(Err(e)) => Err(format!("{e:#}")),
                        Err(payload) => Err(panic_message(payload.as_ref())),
                    };
                    (name, outcome, start.elapsed())
                });
            }

            while let Some(joined) = join_set.join_next().await {
                let (name, outcome, duration) = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!("task join error: {}", e);
                        continue;
                    }
                };

                let report = match outcome {
                    Ok(output) => TaskReport::succeeded(&name, output.artifacts, duration),
                    Err(message) => {
                        tracing::warn!(task = %name, error = %message, "task failed");
                        TaskReport::failed(&name, message, duration)
                    }
                };
                self.print_report(&report);
                reports.insert(name, report);
            }

            // A join error leaves no outcome behind; record it so the batch settles
            for name in batch {
                reports
                    .entry(name.clone())
                    .or_insert_with(|| TaskReport::failed(name, "task was aborted", Duration::ZERO));
            }
        }

        let reports = plan
            .tasks()
            .filter_map(|name| reports.remove(name))
            .collect();

        RunResult {
            requested: plan.requested.clone(),
            reports,
            duration: started.elapsed(),
        }
    }

    /// A skip report if any dependency of `name` did not succeed
    fn blocked_report(
        &self,
        name: &str,
        reports: &HashMap<String, TaskReport>,
    ) -> Option<TaskReport> {
        let task = self.graph.lookup(name).ok()?;
        let blocker = task.dependencies.iter().find(|dep| {
            !reports
                .get(dep.as_str())
                .is_some_and(|report| report.status.is_success())
        })?;
        tracing::debug!(task = %name, dependency = %blocker, "skipping task");
        Some(TaskReport::skipped(
            name,
            format!("dependency '{}' did not succeed", blocker),
        ))
    }

    fn print_header(&self, name: &str) {
        if !self.config.print_progress {
            return;
        }
        println!(
            "┌─ {} {}",
            "Running task".bold(),
            format!("'{}'", name).color(get_task_color(name)).bold()
        );
    }

    fn print_report(&self, report: &TaskReport) {
        if !self.config.print_progress {
            return;
        }
        let name = report.name.color(get_task_color(&report.name));
        match report.status {
            TaskStatus::Succeeded => println!(
                "{} {} {}",
                "✓".green().bold(),
                name,
                format!("({} ms)", report.duration.as_millis()).dimmed()
            ),
            TaskStatus::Failed => println!(
                "{} {} {}",
                "✗".red().bold(),
                name,
                report.error.as_deref().unwrap_or("failed").red()
            ),
            TaskStatus::Skipped | TaskStatus::Cancelled => println!(
                "{} {} {}",
                "⊘".yellow().bold(),
                name,
                report
                    .error
                    .as_deref()
                    .unwrap_or("cancelled")
                    .yellow()
            ),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("task panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("task panicked: {}", message)
    } else {
        "task panicked".to_string()
    }
}
