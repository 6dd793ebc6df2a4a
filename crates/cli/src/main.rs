use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use runnel_core::types::{RunnelError, EXIT_RUN_FAILED};
use runnel_core::workspace_manager::{WorkspaceManager, WorkspaceManagerConfig};

mod commands;
mod logging;

/// Runnel - A dependency-ordered task runner
#[derive(Parser)]
#[command(name = "runnel")]
#[command(about = "Run named tasks in dependency order and re-run them on file changes")]
#[command(version)]
struct Cli {
    /// Path to the workspace root (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Mode handed to tasks through RUNNEL_MODE
    #[arg(long, global = true, conflicts_with = "prod")]
    mode: Option<String>,

    /// Shorthand for `--mode production`
    #[arg(long, global = true)]
    prod: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task and everything it depends on
    Run {
        /// Task to run (defaults to the workspace's default task)
        task: Option<String>,
    },
    /// List the tasks in the workspace
    List,
    /// Show execution plan for a task without running it
    Plan {
        /// Task to plan
        task: String,
    },
    /// Show the task dependency graph
    Graph,
    /// Watch files and re-run the tasks bound to them
    Watch {
        /// Run the default task once before watching
        #[arg(long)]
        run_first: bool,
    },
    /// Print the JSON schema of task files
    Schema,
}

impl Cli {
    fn mode(&self) -> Option<String> {
        if self.prod {
            Some("production".to_string())
        } else {
            self.mode.clone()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Schema = cli.command {
        return commands::schema::execute();
    }

    tracing::debug!(workspace = %cli.workspace.display(), mode = ?cli.mode(), "loading workspace");

    // Initialize workspace manager with all business logic
    let config = WorkspaceManagerConfig {
        workspace_root: cli.workspace.clone(),
        mode: cli.mode(),
    };
    // `graph` must still load a cyclic workspace so it can report the cycles
    let manager = match cli.command {
        Commands::Graph => WorkspaceManager::new_unvalidated(config),
        _ => WorkspaceManager::new(config),
    }
    .context("Failed to initialize workspace")?;

    // Execute command (CLI layer only handles presentation)
    match cli.command {
        Commands::Run { task } => {
            print_banner(&manager);
            commands::run::execute(&manager, task.as_deref()).await
        }
        Commands::List => commands::list::execute(&manager),
        Commands::Plan { task } => commands::plan::execute(&manager, &task),
        Commands::Graph => commands::graph::execute(&manager),
        Commands::Watch { run_first } => {
            print_banner(&manager);
            commands::watch::execute(&manager, run_first).await
        }
        Commands::Schema => commands::schema::execute(),
    }
}

fn print_banner(manager: &WorkspaceManager) {
    if let Some(banner) = manager.banner() {
        println!("{}", banner.magenta().bold());
        println!();
    }
}

/// Exit code of the first [`RunnelError`] in the error chain
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<RunnelError>())
        .map(RunnelError::exit_code)
        .unwrap_or(EXIT_RUN_FAILED)
}
