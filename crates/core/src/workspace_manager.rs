//! High-level workspace management interface
//!
//! This module provides the [`WorkspaceManager`] which serves as the primary interface
//! for all workspace operations. It loads the YAML configuration, builds the
//! [`TaskGraph`] and exposes planning, execution and watch mode.
//!
//! ## Example
//!
//! ```rust,no_run
//! use runnel_core::workspace_manager::{WorkspaceManager, WorkspaceManagerConfig};
//! use runnel_core::execution::TaskRunnerConfig;
//! use std::path::PathBuf;
//!
//! # async fn example() -> runnel_core::types::RunnelResult<()> {
//! let manager = WorkspaceManager::new(WorkspaceManagerConfig {
//!     workspace_root: PathBuf::from("."),
//!     mode: Some("production".to_string()),
//! })?;
//!
//! // Get execution plan for a task
//! let plan = manager.get_execution_plan("default")?;
//!
//! // Run a task
//! let result = manager.run_task("default", TaskRunnerConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::configs::{
    tasks::{parse_tasks_config, TaskConfig, TasksFileConfig},
    workspace::{parse_workspace_config, WorkspaceConfig},
};
use crate::execution::{
    resolve_execution_plan, CommandKind, CommandWork, ExecutionPlan, TaskRunner, TaskRunnerConfig,
};
use crate::registry::TaskGraph;
use crate::results::{DependencyGraphResult, RunResult, TaskInfo, TaskListResult};
use crate::task::Task;
use crate::types::{RunnelError, RunnelResult};
use crate::watch::{WatchEngine, WatchHandle, WatchOptions, WatchRule};

/// Directory holding the configuration, relative to the workspace root
pub const CONFIG_DIR: &str = ".runnel";

/// High-level workspace manager that encapsulates all workspace operations
pub struct WorkspaceManager {
    pub root: PathBuf,
    pub workspace_config: WorkspaceConfig,
    pub task_configs: TasksFileConfig,
    pub graph: Arc<TaskGraph>,
    pub mode: Option<String>,
}

/// Configuration for initializing a workspace manager
pub struct WorkspaceManagerConfig {
    pub workspace_root: PathBuf,
    /// Opaque mode value handed through to work functions
    pub mode: Option<String>,
}

impl WorkspaceManager {
    /// Load the configuration under `workspace_root` and build the task graph.
    ///
    /// Fails if any dependency is unknown or the graph has a cycle.
    pub fn new(config: WorkspaceManagerConfig) -> RunnelResult<Self> {
        let manager = Self::new_unvalidated(config)?;
        manager.graph.validate()?;
        Ok(manager)
    }

    /// Load the configuration without checking dependencies or cycles, for
    /// inspecting a broken graph (see [`WorkspaceManager::get_dependency_graph`]).
    pub fn new_unvalidated(config: WorkspaceManagerConfig) -> RunnelResult<Self> {
        let root = config.workspace_root;
        let config_dir = root.join(CONFIG_DIR);
        if !config_dir.is_dir() {
            return Err(RunnelError::Config(format!(
                "No {} directory found in {}",
                CONFIG_DIR,
                root.display()
            )));
        }

        let workspace_config = Self::load_workspace_config(&root)?;
        let task_configs = Self::load_task_configs(&root)?;
        let graph = build_task_graph(&root, &task_configs.tasks, config.mode.as_deref())?;

        tracing::debug!(
            root = %root.display(),
            tasks = graph.len(),
            watch_rules = task_configs.watch.len(),
            "workspace loaded"
        );

        Ok(Self {
            root,
            workspace_config,
            task_configs,
            graph: Arc::new(graph),
            mode: config.mode,
        })
    }

    /// Visible tasks in registration order
    pub fn list_tasks(&self) -> TaskListResult {
        let tasks = self
            .graph
            .list_visible()
            .into_iter()
            .map(|task| TaskInfo {
                name: task.name.clone(),
                description: task.description.clone(),
                dependencies: task.dependencies.clone(),
            })
            .collect();

        TaskListResult {
            workspace_name: self.workspace_config.name.clone(),
            default_task: self.default_task().to_string(),
            tasks,
        }
    }

    /// Name of the task to run when none is given
    pub fn default_task(&self) -> &str {
        self.workspace_config.default_task()
    }

    /// Start-up banner, when the workspace has a name
    pub fn banner(&self) -> Option<String> {
        let name = self.workspace_config.name.as_deref()?;
        let version = self
            .workspace_config
            .version
            .as_deref()
            .map(|v| format!(" v{}", v))
            .unwrap_or_default();
        let mode = self.mode.as_deref().unwrap_or("default");
        Some(format!("#----> {}{} {} <----#", name, version, mode))
    }

    /// Get execution plan for a task
    pub fn get_execution_plan(&self, task_name: &str) -> RunnelResult<ExecutionPlan> {
        resolve_execution_plan(&self.graph, &[task_name.to_string()])
    }

    /// Resolve and execute a task.
    ///
    /// Resolution errors are returned as `Err`; task failures are reported in
    /// the returned [`RunResult`].
    pub async fn run_task(
        &self,
        task_name: &str,
        runner_config: TaskRunnerConfig,
    ) -> RunnelResult<RunResult> {
        let plan = self.get_execution_plan(task_name)?;
        let runner = TaskRunner::with_config(&self.graph, runner_config);
        Ok(runner.run(&plan).await)
    }

    /// Get dependency graph information
    pub fn get_dependency_graph(&self) -> DependencyGraphResult {
        DependencyGraphResult {
            graph: self.graph.to_graph(),
            cycles: self.graph.cycles(),
        }
    }

    /// One rule per configured watch pattern, in configuration order
    pub fn watch_rules(&self) -> Vec<WatchRule> {
        self.task_configs
            .watch
            .iter()
            .flat_map(|watch| {
                watch
                    .patterns
                    .iter()
                    .map(|pattern| WatchRule::new(pattern.clone(), watch.tasks.clone()))
            })
            .collect()
    }

    /// Start watching the configured rules
    pub fn start_watch(&self, runner_config: TaskRunnerConfig) -> RunnelResult<WatchHandle> {
        let rules = self.watch_rules();
        if rules.is_empty() {
            return Err(RunnelError::Config(
                "No watch rules configured".to_string(),
            ));
        }

        let options = WatchOptions::new(
            &self.root,
            Duration::from_millis(self.workspace_config.debounce_ms()),
        );
        WatchEngine::new(Arc::clone(&self.graph), options)
            .with_runner_config(runner_config)
            .start_watch(rules)
    }

    // Private helper methods

    fn load_workspace_config(workspace_root: &Path) -> RunnelResult<WorkspaceConfig> {
        let workspace_config_path = workspace_root.join(CONFIG_DIR).join("workspace.yml");
        if !workspace_config_path.exists() {
            return Ok(WorkspaceConfig::default());
        }

        let content = std::fs::read_to_string(&workspace_config_path)
            .map_err(|e| read_error("workspace config", &workspace_config_path, e))?;

        parse_workspace_config(&content).map_err(|e| {
            RunnelError::Config(format!(
                "Failed to parse workspace config {}: {}",
                workspace_config_path.display(),
                e
            ))
        })
    }

    /// Read every `.runnel/tasks/*.yml` in file-name order and merge them
    fn load_task_configs(workspace_root: &Path) -> RunnelResult<TasksFileConfig> {
        let tasks_dir = workspace_root.join(CONFIG_DIR).join("tasks");
        let mut paths = Vec::new();

        if tasks_dir.exists() {
            let entries = std::fs::read_dir(&tasks_dir)
                .map_err(|e| read_error("tasks directory", &tasks_dir, e))?;
            for entry in entries {
                let path = entry
                    .map_err(|e| read_error("tasks directory", &tasks_dir, e))?
                    .path();
                if matches!(
                    path.extension().and_then(|s| s.to_str()),
                    Some("yml" | "yaml")
                ) {
                    paths.push(path);
                }
            }
        }
        paths.sort();

        let mut merged = TasksFileConfig::default();
        for path in paths {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| read_error("task config", &path, e))?;
            let config = parse_tasks_config(&content).map_err(|e| {
                RunnelError::Config(format!("Failed to parse task config {}: {}", path.display(), e))
            })?;

            merged.tasks.extend(config.tasks);
            merged.watch.extend(config.watch);
            if config.description.is_some() {
                merged.description = config.description;
            }
        }

        Ok(merged)
    }
}

/// Configuration that cannot be read is a configuration error, not a run failure
fn read_error(what: &str, path: &Path, e: std::io::Error) -> RunnelError {
    RunnelError::Config(format!("Failed to read {} {}: {}", what, path.display(), e))
}

/// Register every configured task, picking each task's command for `mode`.
///
/// Dependencies are not checked here; see [`TaskGraph::validate`].
pub fn build_task_graph(
    root: &Path,
    tasks: &[TaskConfig],
    mode: Option<&str>,
) -> RunnelResult<TaskGraph> {
    let mut graph = TaskGraph::new();

    for config in tasks {
        let dependencies = config.dependencies.clone().unwrap_or_default();
        let kind = command_for(config, mode)?;

        let mut task = match kind {
            Some(kind) => Task::new(
                config.name.clone(),
                CommandWork::new(root, config.name.clone(), kind, mode.map(str::to_string)),
            )
            .with_dependencies(dependencies),
            None => Task::aggregate(config.name.clone(), dependencies),
        };
        if let Some(description) = &config.description {
            task = task.with_description(description.clone());
        }

        graph.register(task.internal(config.internal))?;
    }

    Ok(graph)
}

/// The command a task runs under `mode`, or `None` for a pure aggregate task
fn command_for(config: &TaskConfig, mode: Option<&str>) -> RunnelResult<Option<CommandKind>> {
    if config.script.is_some() && config.command.is_some() {
        return Err(RunnelError::Config(format!(
            "Task '{}' declares both a script and a command",
            config.name
        )));
    }

    let mode_command = mode.and_then(|mode| config.modes.as_ref()?.get(mode));
    if let Some(command) = mode_command {
        return Ok(Some(CommandKind::from(command)));
    }

    Ok(match (&config.script, &config.command) {
        (Some(script), _) => Some(CommandKind::Script(script.clone())),
        (None, Some(command)) => Some(CommandKind::from(command)),
        (None, None) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::TaskStatus;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn manager(root: &Path, mode: Option<&str>) -> RunnelResult<WorkspaceManager> {
        WorkspaceManager::new(WorkspaceManagerConfig {
            workspace_root: root.to_path_buf(),
            mode: mode.map(str::to_string),
        })
    }

    fn sample_workspace() -> tempfile::TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(
            root,
            ".runnel/workspace.yml",
            "name: mentat\nversion: 0.4.1\ndebounceMs: 50\n",
        );
        write(
            root,
            ".runnel/tasks/10-assets.yml",
            r#"
tasks:
  - name: clean
    description: Remove generated files
    command: rm -f style.css script.js
  - name: style
    description: Recompile Less files
    command: echo dev > style.css
    dependencies: [clean]
    modes:
      production: echo prod > style.css
  - name: script
    description: Minify scripts
    command: [touch, script.js]
    dependencies: [clean]
watch:
  - patterns: ["style/*.less"]
    tasks: [style]
  - patterns: ["controllers/*.js", "lib/*.js"]
    tasks: [script]
"#,
        );
        write(
            root,
            ".runnel/tasks/20-default.yml",
            r#"
tasks:
  - name: "--rerun"
    internal: true
    command: "true"
  - name: default
    description: Build everything
    dependencies: [style, script]
"#,
        );
        temp_dir
    }

    #[test]
    fn test_tasks_are_registered_in_file_order() {
        let workspace = sample_workspace();
        let manager = manager(workspace.path(), None).unwrap();

        let listed = manager.list_tasks();
        let names: Vec<&str> = listed.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["clean", "style", "script", "default"]);
        assert_eq!(listed.workspace_name.as_deref(), Some("mentat"));
        assert_eq!(listed.default_task, "default");
        assert_eq!(
            listed.tasks[1].description.as_deref(),
            Some("Recompile Less files")
        );
        assert!(manager.graph.lookup("--rerun").unwrap().internal);
    }

    #[test]
    fn test_banner() {
        let workspace = sample_workspace();
        let manager = manager(workspace.path(), Some("production")).unwrap();
        assert_eq!(
            manager.banner().as_deref(),
            Some("#----> mentat v0.4.1 production <----#")
        );
    }

    #[test]
    fn test_plan_for_default_task() {
        let workspace = sample_workspace();
        let manager = manager(workspace.path(), None).unwrap();

        let plan = manager.get_execution_plan("default").unwrap();
        assert_eq!(
            plan.batches,
            vec![
                vec!["clean".to_string()],
                vec!["style".to_string(), "script".to_string()],
                vec!["default".to_string()],
            ]
        );
    }

    #[test]
    fn test_watch_rules_expand_patterns() {
        let workspace = sample_workspace();
        let manager = manager(workspace.path(), None).unwrap();

        assert_eq!(
            manager.watch_rules(),
            vec![
                WatchRule::new("style/*.less", ["style"]),
                WatchRule::new("controllers/*.js", ["script"]),
                WatchRule::new("lib/*.js", ["script"]),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_task_uses_mode_command() {
        let workspace = sample_workspace();
        let manager = manager(workspace.path(), Some("production")).unwrap();

        let result = manager
            .run_task("default", TaskRunnerConfig::default())
            .await
            .unwrap();
        assert!(result.is_success(), "{:?}", result.reports);

        let style = std::fs::read_to_string(workspace.path().join("style.css")).unwrap();
        assert_eq!(style.trim(), "prod");
        assert!(workspace.path().join("script.js").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_task_without_mode_uses_default_command() {
        let workspace = sample_workspace();
        let manager = manager(workspace.path(), None).unwrap();

        let result = manager
            .run_task("style", TaskRunnerConfig::default())
            .await
            .unwrap();
        assert_eq!(result.status_of("style"), Some(TaskStatus::Succeeded));
        let style = std::fs::read_to_string(workspace.path().join("style.css")).unwrap();
        assert_eq!(style.trim(), "dev");
    }

    #[tokio::test]
    async fn test_unknown_task_is_a_resolution_error() {
        let workspace = sample_workspace();
        let manager = manager(workspace.path(), None).unwrap();

        let err = manager
            .run_task("deploy", TaskRunnerConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnelError::TaskNotFound(_)));
        assert_eq!(err.exit_code(), crate::types::EXIT_RESOLUTION_FAILED);
    }

    #[test]
    fn test_duplicate_task_across_files() {
        let workspace = sample_workspace();
        write(
            workspace.path(),
            ".runnel/tasks/30-extra.yml",
            "tasks:\n  - name: style\n    command: echo again\n",
        );

        let err = manager(workspace.path(), None).err().unwrap();
        assert!(matches!(err, RunnelError::DuplicateTask(name) if name == "style"));
    }

    #[test]
    fn test_unknown_dependency_fails_at_load() {
        let workspace = sample_workspace();
        write(
            workspace.path(),
            ".runnel/tasks/30-extra.yml",
            "tasks:\n  - name: watch\n    dependencies: [\"lint:json\"]\n",
        );

        let err = manager(workspace.path(), None).err().unwrap();
        assert!(matches!(err, RunnelError::UnknownDependency { .. }));
    }

    fn write_cyclic_tasks(root: &Path) {
        write(
            root,
            ".runnel/tasks/tasks.yml",
            "tasks:\n  - name: a\n    dependencies: [b]\n  - name: b\n    dependencies: [a]\n  - name: c\n",
        );
    }

    #[test]
    fn test_cycle_fails_at_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_cyclic_tasks(temp_dir.path());

        let err = manager(temp_dir.path(), None).err().unwrap();
        assert!(matches!(err, RunnelError::Cycle(_)));
        assert_eq!(err.exit_code(), crate::types::EXIT_RESOLUTION_FAILED);
    }

    #[test]
    fn test_unvalidated_load_reports_cycles() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_cyclic_tasks(temp_dir.path());

        let manager = WorkspaceManager::new_unvalidated(WorkspaceManagerConfig {
            workspace_root: temp_dir.path().to_path_buf(),
            mode: None,
        })
        .unwrap();

        let result = manager.get_dependency_graph();
        assert_eq!(result.graph.node_count(), 3);
        assert_eq!(result.cycles, vec![vec!["a".to_string(), "b".to_string()]]);
        assert!(matches!(
            manager.get_execution_plan("a"),
            Err(RunnelError::Cycle(_))
        ));
    }

    #[test]
    fn test_unreadable_tasks_directory_is_a_config_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        // `tasks` exists but is a file, so it cannot be listed
        write(temp_dir.path(), ".runnel/tasks", "not a directory");

        let err = manager(temp_dir.path(), None).err().unwrap();
        assert!(matches!(err, RunnelError::Config(ref msg) if msg.contains("tasks directory")));
        assert_eq!(err.exit_code(), crate::types::EXIT_RESOLUTION_FAILED);
    }

    #[test]
    fn test_read_errors_map_to_resolution_exit_code() {
        let err = read_error(
            "tasks directory",
            Path::new(".runnel/tasks"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.exit_code(), crate::types::EXIT_RESOLUTION_FAILED);
        assert!(err.to_string().contains(".runnel/tasks"));
    }

    #[test]
    fn test_demo_workspace_cleans_before_default_build() {
        let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/mentat");
        let manager = manager(&demo, None).unwrap();

        let plan = manager.get_execution_plan("default").unwrap();
        assert_eq!(
            plan.batches,
            vec![
                vec!["clean".to_string(), "lint".to_string()],
                vec!["build:style".to_string(), "build:script".to_string()],
                vec!["default".to_string()],
            ]
        );

        // Watch-triggered rebuilds stay incremental
        let style = manager.get_execution_plan("style").unwrap();
        assert_eq!(style.batches, vec![vec!["style".to_string()]]);
    }

    #[test]
    fn test_missing_config_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = manager(temp_dir.path(), None).err().unwrap();
        assert!(matches!(err, RunnelError::Config(_)));
    }

    #[test]
    fn test_workspace_config_is_optional() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(
            temp_dir.path(),
            ".runnel/tasks/tasks.yml",
            "tasks:\n  - name: default\n",
        );
        let manager = manager(temp_dir.path(), None).unwrap();
        assert_eq!(manager.default_task(), "default");
        assert_eq!(manager.workspace_config.debounce_ms(), 100);
    }

    #[test]
    fn test_script_and_command_are_exclusive() {
        let config = TaskConfig {
            name: "both".to_string(),
            description: None,
            script: Some("scripts/build.sh".to_string()),
            command: Some(crate::configs::tasks::Command::Single("make".to_string())),
            dependencies: None,
            internal: false,
            modes: None,
        };
        assert!(matches!(command_for(&config, None), Err(RunnelError::Config(_))));
    }
}
