//! Task definitions and the work-function contract
//!
//! A [`Task`] pairs a name and its dependency list with an opaque
//! [`WorkFn`]. The runner never looks inside a work function: compilers,
//! linters and shell commands all sit behind the same trait.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use colored::Color;

/// Output reported by a successful work function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkOutput {
    /// Files produced by the task, if it chose to report them
    pub artifacts: Vec<PathBuf>,
}

impl WorkOutput {
    pub fn with_artifacts(artifacts: Vec<PathBuf>) -> Self {
        Self { artifacts }
    }
}

/// The unit of work a task performs.
///
/// Implementations may block (file I/O, subprocesses); the runner calls them
/// on a blocking thread. Anything the work needs, such as the active mode,
/// must be captured when the work function is built.
pub trait WorkFn: Send + Sync {
    fn run(&self) -> anyhow::Result<WorkOutput>;
}

impl<F> WorkFn for F
where
    F: Fn() -> anyhow::Result<WorkOutput> + Send + Sync,
{
    fn run(&self) -> anyhow::Result<WorkOutput> {
        self()
    }
}

/// A named unit of work with declared dependencies
#[derive(Clone)]
pub struct Task {
    pub name: String,
    pub dependencies: Vec<String>,
    pub description: Option<String>,
    /// Internal tasks are only meant to be triggered by other tasks or
    /// watch rules and are hidden from listings.
    pub internal: bool,
    pub work: Arc<dyn WorkFn>,
}

impl Task {
    pub fn new(name: impl Into<String>, work: impl WorkFn + 'static) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            description: None,
            internal: false,
            work: Arc::new(work),
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, work: F) -> Self
    where
        F: Fn() -> anyhow::Result<WorkOutput> + Send + Sync + 'static,
    {
        Self::new(name, work)
    }

    /// A task that does nothing by itself and only groups its dependencies.
    pub fn aggregate(name: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self::from_fn(name, || Ok(WorkOutput::default())).with_dependencies(dependencies)
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("description", &self.description)
            .field("internal", &self.internal)
            .finish_non_exhaustive()
    }
}

/// Get a consistent color for a task name
pub fn get_task_color(task_name: &str) -> Color {
    let hash = task_name
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));

    // Label colors that stay clear of the red/green used for status lines
    let colors = [
        Color::TrueColor {
            r: 147,
            g: 112,
            b: 219,
        }, // Medium slate blue
        Color::TrueColor {
            r: 64,
            g: 224,
            b: 208,
        }, // Turquoise
        Color::TrueColor {
            r: 255,
            g: 140,
            b: 0,
        }, // Dark orange
        Color::TrueColor {
            r: 199,
            g: 21,
            b: 133,
        }, // Medium violet red
        Color::TrueColor {
            r: 72,
            g: 209,
            b: 204,
        }, // Medium turquoise
        Color::TrueColor {
            r: 138,
            g: 43,
            b: 226,
        }, // Blue violet
    ];

    colors[(hash % colors.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_work_fn() {
        let task = Task::from_fn("style", || {
            Ok(WorkOutput::with_artifacts(vec![PathBuf::from(
                "public/static/css/style.css",
            )]))
        });
        let output = task.work.run().unwrap();
        assert_eq!(output.artifacts.len(), 1);
    }

    #[test]
    fn test_builder_sets_fields() {
        let task = Task::aggregate("default", vec!["style".to_string(), "script".to_string()])
            .with_description("Build everything")
            .internal(true);
        assert_eq!(task.dependencies, vec!["style", "script"]);
        assert_eq!(task.description.as_deref(), Some("Build everything"));
        assert!(task.internal);
        assert_eq!(task.work.run().unwrap(), WorkOutput::default());
    }

    #[test]
    fn test_task_color_is_stable() {
        assert_eq!(get_task_color("lint"), get_task_color("lint"));
    }
}
