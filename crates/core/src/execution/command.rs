//! Command execution utilities
//!
//! [`CommandWork`] is the work function behind every task declared in YAML.
//! It runs a shell command, an executable with arguments, or a script file
//! from the workspace root and turns a non-zero exit into a task failure.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context};

use crate::configs::tasks::Command as TaskCommand;
use crate::task::{WorkFn, WorkOutput};

/// Environment variable carrying the task name into commands
pub const TASK_ENV: &str = "RUNNEL_TASK";

/// Environment variable carrying the active mode (e.g. `production`)
pub const MODE_ENV: &str = "RUNNEL_MODE";

/// What a command-backed task runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// A single string handed to `sh -c`
    Shell(String),
    /// An executable followed by its arguments
    Args(Vec<String>),
    /// A script path, relative paths resolved against the workspace root
    Script(String),
}

impl From<&TaskCommand> for CommandKind {
    fn from(command: &TaskCommand) -> Self {
        match command {
            TaskCommand::Single(cmd) => CommandKind::Shell(cmd.clone()),
            TaskCommand::Multiple(cmds) => CommandKind::Args(cmds.clone()),
        }
    }
}

/// Work function that runs an external command
#[derive(Debug, Clone)]
pub struct CommandWork {
    root: PathBuf,
    task_name: String,
    kind: CommandKind,
    mode: Option<String>,
}

impl CommandWork {
    pub fn new(
        root: impl Into<PathBuf>,
        task_name: impl Into<String>,
        kind: CommandKind,
        mode: Option<String>,
    ) -> Self {
        Self {
            root: root.into(),
            task_name: task_name.into(),
            kind,
            mode,
        }
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Execute a command with common setup and error handling
    fn execute_command(&self, command: &mut Command, label: &str) -> anyhow::Result<()> {
        command.current_dir(&self.root);
        command.env(TASK_ENV, &self.task_name);
        if let Some(mode) = &self.mode {
            command.env(MODE_ENV, mode);
        }

        tracing::debug!(task = %self.task_name, command = %label, "spawning command");
        let status = command
            .status()
            .with_context(|| format!("Failed to execute {}", label))?;

        if !status.success() {
            bail!(
                "{} failed with exit code {}",
                label,
                status.code().unwrap_or(-1)
            );
        }
        Ok(())
    }

    /// Execute a script file
    fn execute_script(&self, script_path: &str) -> anyhow::Result<()> {
        let script_path_buf = PathBuf::from(script_path);

        let full_script_path = if script_path_buf.is_relative() {
            self.root.join(script_path_buf)
        } else {
            script_path_buf
        };

        if !full_script_path.exists() {
            bail!("Script file '{}' not found", full_script_path.display());
        }

        let mut command = Command::new(&full_script_path);
        self.execute_command(
            &mut command,
            &format!("script '{}'", full_script_path.display()),
        )
    }

    /// Execute a command with arguments
    fn execute_command_with_args(&self, cmds: &[String]) -> anyhow::Result<()> {
        let Some((program, args)) = cmds.split_first() else {
            return Ok(());
        };
        let mut command = Command::new(program);
        command.args(args);
        self.execute_command(&mut command, &format!("command '{}'", program))
    }

    /// Execute a single shell command
    fn execute_shell_command(&self, cmd: &str) -> anyhow::Result<()> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd);
        self.execute_command(&mut command, &format!("command '{}'", cmd))
    }
}

impl WorkFn for CommandWork {
    fn run(&self) -> anyhow::Result<WorkOutput> {
        match &self.kind {
            CommandKind::Shell(cmd) => self.execute_shell_command(cmd)?,
            CommandKind::Args(cmds) => self.execute_command_with_args(cmds)?,
            CommandKind::Script(path) => self.execute_script(path)?,
        }
        Ok(WorkOutput::default())
    }
}
