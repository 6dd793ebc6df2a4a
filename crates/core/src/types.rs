use thiserror::Error;

/// Exit code for a run where at least one task failed or was skipped.
pub const EXIT_RUN_FAILED: u8 = 1;

/// Exit code for configuration and resolution errors (nothing was run).
pub const EXIT_RESOLUTION_FAILED: u8 = 2;

/// The main error type for Runnel operations
#[derive(Debug, Error)]
pub enum RunnelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Task '{task}' depends on '{dependency}' which is not registered")]
    UnknownDependency { task: String, dependency: String },

    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Circular dependency detected: {}", format_cycle(.0))]
    Cycle(Vec<String>),

    #[error("Watch error: {0}")]
    WatchHandle(String),

    #[error("{failed} task(s) failed, {skipped} task(s) skipped")]
    TaskFailed { failed: usize, skipped: usize },
}

impl RunnelError {
    /// Process exit code for this error.
    ///
    /// Errors raised before anything ran (bad configuration, unknown task,
    /// cycles) map to [`EXIT_RESOLUTION_FAILED`] so callers can tell them
    /// apart from a run that executed and failed.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunnelError::Config(_)
            | RunnelError::Yaml(_)
            | RunnelError::DuplicateTask(_)
            | RunnelError::UnknownDependency { .. }
            | RunnelError::TaskNotFound(_)
            | RunnelError::Cycle(_) => EXIT_RESOLUTION_FAILED,
            RunnelError::Io(_) | RunnelError::WatchHandle(_) | RunnelError::TaskFailed { .. } => {
                EXIT_RUN_FAILED
            }
        }
    }
}

/// Render a cycle as `a -> b -> a`.
fn format_cycle(cycle: &[String]) -> String {
    let mut path = cycle.to_vec();
    if let Some(first) = path.first().cloned() {
        path.push(first);
    }
    path.join(" -> ")
}

/// Result type alias for Runnel operations
pub type RunnelResult<T> = Result<T, RunnelError>;
