//! Runnel Core Library
//!
//! This is the core library for the Runnel task runner. It provides the task
//! registry, dependency resolution, the batch executor and the watch engine.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`workspace_manager`] - High-level workspace management interface
//! - [`registry`] - The [`TaskGraph`] of registered tasks
//! - [`execution`] - Dependency resolution, batch planning and the task runner
//! - [`watch`] - File watching, debouncing and triggered re-runs
//! - [`task`] - Task definitions and work functions
//! - [`configs`] - Configuration parsing for the workspace and task files
//! - [`results`] - Result types for runs and listings
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! Tasks can be registered directly:
//!
//! ```rust,no_run
//! use runnel_core::{execution::{resolve_execution_plan, TaskRunner}, Task, TaskGraph, WorkOutput};
//!
//! # async fn example() -> runnel_core::RunnelResult<()> {
//! let mut graph = TaskGraph::new();
//! graph.register(Task::from_fn("clean", || Ok(WorkOutput::default())))?;
//! graph.register(
//!     Task::from_fn("style", || Ok(WorkOutput::default())).with_dependencies(["clean"]),
//! )?;
//!
//! let plan = resolve_execution_plan(&graph, &["style".to_string()])?;
//! let result = TaskRunner::new(&graph).run(&plan).await;
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! or loaded from `.runnel/` through the [`WorkspaceManager`].

pub mod configs;
pub mod execution;
pub mod registry;
pub mod results;
pub mod task;
pub mod types;
pub mod watch;
pub mod workspace_manager;

// Re-export the main types for easier usage
pub use registry::TaskGraph;
pub use task::{Task, WorkFn, WorkOutput};
pub use types::{RunnelError, RunnelResult};
pub use workspace_manager::{WorkspaceManager, WorkspaceManagerConfig};
