use std::future::Future;

use anyhow::{Context, Result};
use colored::*;
use runnel_core::execution::TaskRunnerConfig;
use runnel_core::watch::WatchHandle;
use runnel_core::workspace_manager::WorkspaceManager;

use super::run::print_summary;

pub async fn execute(manager: &WorkspaceManager, run_first: bool) -> Result<()> {
    let config = TaskRunnerConfig { print_progress: true };

    if run_first {
        let task = manager.default_task();
        println!("{} {}", "Running task".bold(), task.cyan());
        let result = manager
            .run_task(task, config.clone())
            .await
            .context("Failed to run task")?;
        print_summary(&result);
        println!();
    }

    let mut handle = manager
        .start_watch(config)
        .context("Failed to start watching")?;

    for rule in manager.watch_rules() {
        println!(
            "{} {} {} {}",
            "Watching".bold(),
            rule.pattern.cyan(),
            "->".dimmed(),
            rule.tasks.join(", ")
        );
    }
    println!("{}", "Press Ctrl-C to stop".dimmed());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    watch_until(&mut handle, shutdown).await;

    handle.stop().await;
    println!("{}", "Stopped watching".dimmed());
    Ok(())
}

/// Print every finished run until `shutdown` completes or the watch ends.
/// Returns the number of runs received.
async fn watch_until(handle: &mut WatchHandle, shutdown: impl Future<Output = ()>) -> usize {
    tokio::pin!(shutdown);
    let mut runs = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            run = handle.next_run() => match run {
                Some(Ok(result)) => {
                    runs += 1;
                    print_summary(&result);
                    println!();
                }
                Some(Err(err)) => eprintln!("{} {}", "Error:".red().bold(), err),
                None => break,
            },
        }
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use runnel_core::types::RunnelResult;
    use runnel_core::watch::{ChangeSender, WatchBackend, WatchEngine, WatchOptions, WatchRule};
    use runnel_core::{Task, TaskGraph, WorkOutput};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    /// Reports one change to `style/style.less` as soon as it starts
    struct OneChange;

    impl WatchBackend for OneChange {
        fn start(&mut self, _roots: &[PathBuf], changes: ChangeSender) -> RunnelResult<()> {
            changes
                .send(PathBuf::from("/project/style/style.less"))
                .map_err(|e| runnel_core::RunnelError::WatchHandle(e.to_string()))
        }
    }

    fn start() -> WatchHandle {
        let mut graph = TaskGraph::new();
        graph
            .register(Task::from_fn("style", || Ok(WorkOutput::default())))
            .unwrap();
        WatchEngine::new(
            Arc::new(graph),
            WatchOptions {
                root: PathBuf::from("/project"),
                debounce: Duration::from_millis(10),
            },
        )
        .start_with_backend(vec![WatchRule::new("style/*.less", ["style"])], OneChange)
        .unwrap()
    }

    #[tokio::test]
    async fn test_shutdown_after_a_run_stops_the_loop() {
        let mut handle = start();

        let shutdown = tokio::time::sleep(Duration::from_millis(500));
        let runs = tokio::time::timeout(Duration::from_secs(5), watch_until(&mut handle, shutdown))
            .await
            .expect("shutdown was not observed");

        assert_eq!(runs, 1);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_ready_shutdown_returns_immediately() {
        let mut handle = start();
        let runs = watch_until(&mut handle, std::future::ready(())).await;
        assert_eq!(runs, 0);
        handle.stop().await;
    }
}
