//! Task execution module
//!
//! Resolution of requested tasks into batched plans, the runner that
//! executes them, and the command-backed work functions used by YAML tasks.

pub mod command;
pub mod dependencies;
pub mod plan;
pub mod runner;

pub use command::{CommandKind, CommandWork};
pub use dependencies::resolve_execution_plan;
pub use plan::ExecutionPlan;
pub use runner::{CancellationFlag, TaskRunner, TaskRunnerConfig};
