//! Watch mode
//!
//! The [`WatchEngine`] turns file changes into task runs:
//!
//! 1. A [`WatchBackend`] delivers changed paths into a channel.
//! 2. An event loop matches each path against the [`WatchRule`]s and
//!    collects the tasks to re-run. The first matching change opens a
//!    debounce window; everything arriving inside it joins the same run.
//! 3. When the window closes, only the collected tasks (and their
//!    dependencies) are resolved and executed.
//!
//! While a run is in progress, further changes are folded into a single
//! pending re-run which starts a fresh debounce window once the current
//! run completes.
//!
//! ```text
//! Idle -> Debouncing -> Running -> Idle
//!                       Running -> Running { pending_rerun } -> Debouncing
//! any state -> Stopped
//! ```

pub mod backend;
pub mod rules;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Instant};

pub use backend::{ChangeSender, NotifyBackend, WatchBackend};
pub use rules::{watch_roots, RuleMatcher, WatchRule};

use crate::execution::dependencies::resolve_execution_plan;
use crate::execution::runner::{CancellationFlag, TaskRunner, TaskRunnerConfig};
use crate::registry::TaskGraph;
use crate::results::RunResult;
use crate::types::{RunnelError, RunnelResult};

/// Observable state of a running watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Debouncing,
    Running { pending_rerun: bool },
    Stopped,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory that rule globs are relative to
    pub root: PathBuf,
    pub debounce: Duration,
}

impl WatchOptions {
    pub fn new(root: impl Into<PathBuf>, debounce: Duration) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root, debounce }
    }
}

pub struct WatchEngine {
    graph: Arc<TaskGraph>,
    options: WatchOptions,
    runner_config: TaskRunnerConfig,
}

impl WatchEngine {
    pub fn new(graph: Arc<TaskGraph>, options: WatchOptions) -> Self {
        Self {
            graph,
            options,
            runner_config: TaskRunnerConfig::default(),
        }
    }

    pub fn with_runner_config(mut self, runner_config: TaskRunnerConfig) -> Self {
        self.runner_config = runner_config;
        self
    }

    /// Start watching with the platform file watcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_watch(&self, rules: Vec<WatchRule>) -> RunnelResult<WatchHandle> {
        self.start_with_backend(rules, NotifyBackend::new())
    }

    /// Start watching with the given backend.
    ///
    /// Every task named by a rule must be registered. Must be called from
    /// within a tokio runtime.
    pub fn start_with_backend<B>(&self, rules: Vec<WatchRule>, backend: B) -> RunnelResult<WatchHandle>
    where
        B: WatchBackend + 'static,
    {
        for rule in &rules {
            for task in &rule.tasks {
                self.graph.lookup(task)?;
            }
        }
        let matcher = RuleMatcher::new(&self.options.root, &rules)?;
        let roots = watch_roots(&self.options.root, &rules);

        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        let mut backend: Box<dyn WatchBackend> = Box::new(backend);
        backend.start(&roots, changes_tx)?;

        let (state_tx, state_rx) = tokio::sync::watch::channel(WatchState::Idle);
        let (stop_tx, stop_rx) = oneshot::channel();
        let (runs_tx, runs_rx) = mpsc::unbounded_channel();
        let cancel = CancellationFlag::new();

        let event_loop = EventLoop {
            graph: Arc::clone(&self.graph),
            matcher,
            debounce: self.options.debounce,
            runner_config: self.runner_config.clone(),
            changes: changes_rx,
            state: state_tx,
            runs: runs_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(event_loop.run(stop_rx));

        tracing::info!(rules = rules.len(), "watch started");
        Ok(WatchHandle {
            backend: Some(backend),
            stop: Some(stop_tx),
            cancel,
            state: state_rx,
            runs: runs_rx,
            task: Some(task),
        })
    }
}

/// Handle to a running watch.
///
/// Dropping the handle stops the watch without waiting for an in-flight
/// run; call [`WatchHandle::stop`] to wait for it.
pub struct WatchHandle {
    backend: Option<Box<dyn WatchBackend>>,
    stop: Option<oneshot::Sender<()>>,
    cancel: CancellationFlag,
    state: tokio::sync::watch::Receiver<WatchState>,
    runs: mpsc::UnboundedReceiver<RunnelResult<RunResult>>,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change
    pub fn subscribe_state(&self) -> tokio::sync::watch::Receiver<WatchState> {
        self.state.clone()
    }

    /// Wait for the next triggered run to finish. Returns `None` once the
    /// watch has stopped and every finished run has been received.
    pub async fn next_run(&mut self) -> Option<RunnelResult<RunResult>> {
        self.runs.recv().await
    }

    /// Stop watching.
    ///
    /// File watchers are released immediately. An in-flight run finishes
    /// its current batch, later batches are cancelled and a pending re-run
    /// is dropped. Calling `stop` more than once is harmless.
    pub async fn stop(&mut self) {
        self.release();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("watch loop terminated abnormally: {}", e);
            }
        }
    }

    fn release(&mut self) {
        if let Some(backend) = self.backend.take() {
            drop(backend);
            tracing::debug!("watch backend released");
        }
        self.cancel.cancel();
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.release();
    }
}

struct EventLoop {
    graph: Arc<TaskGraph>,
    matcher: RuleMatcher,
    debounce: Duration,
    runner_config: TaskRunnerConfig,
    changes: mpsc::UnboundedReceiver<PathBuf>,
    state: tokio::sync::watch::Sender<WatchState>,
    runs: mpsc::UnboundedSender<RunnelResult<RunResult>>,
    cancel: CancellationFlag,
}

type RunHandle = JoinHandle<RunnelResult<RunResult>>;

impl EventLoop {
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        let mut dirty: Vec<String> = Vec::new();
        let mut deadline: Option<Instant> = None;
        let mut running: Option<RunHandle> = None;
        let mut pending_rerun = false;
        let mut changes_open = true;

        loop {
            tokio::select! {
                _ = &mut stop => break,
                change = self.changes.recv(), if changes_open => {
                    let Some(path) = change else {
                        changes_open = false;
                        continue;
                    };
                    let tasks = self.matcher.tasks_for(&path);
                    if tasks.is_empty() {
                        continue;
                    }
                    tracing::debug!(path = %path.display(), ?tasks, "change detected");
                    for task in tasks {
                        if !dirty.contains(&task) {
                            dirty.push(task);
                        }
                    }

                    if running.is_some() {
                        if !pending_rerun {
                            pending_rerun = true;
                            self.set_state(WatchState::Running { pending_rerun: true });
                        }
                    } else if deadline.is_none() {
                        deadline = Some(Instant::now() + self.debounce);
                        self.set_state(WatchState::Debouncing);
                    }
                }
                _ = wait_until(deadline) => {
                    deadline = None;
                    let tasks = std::mem::take(&mut dirty);
                    tracing::info!(?tasks, "re-running tasks");
                    running = Some(self.spawn_run(tasks));
                    self.set_state(WatchState::Running { pending_rerun: false });
                }
                joined = join_run(&mut running) => {
                    running = None;
                    self.publish(joined);
                    if pending_rerun {
                        pending_rerun = false;
                        deadline = Some(Instant::now() + self.debounce);
                        self.set_state(WatchState::Debouncing);
                    } else {
                        self.set_state(WatchState::Idle);
                    }
                }
            }
        }

        self.cancel.cancel();
        if let Some(handle) = running.take() {
            tracing::debug!("waiting for in-flight run to reach a batch boundary");
            let joined = handle.await;
            self.publish(joined);
        }
        if !dirty.is_empty() {
            tracing::debug!(tasks = ?dirty, "dropping pending re-run");
        }
        self.set_state(WatchState::Stopped);
        tracing::info!("watch stopped");
    }

    fn spawn_run(&self, tasks: Vec<String>) -> RunHandle {
        let graph = Arc::clone(&self.graph);
        let cancel = self.cancel.clone();
        let config = self.runner_config.clone();
        tokio::spawn(async move {
            let plan = resolve_execution_plan(&graph, &tasks)?;
            let runner = TaskRunner::with_config(&graph, config);
            let result = runner.run_with_cancellation(&plan, &cancel).await;
            Ok(result)
        })
    }

    fn publish(&self, joined: Result<RunnelResult<RunResult>, JoinError>) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(RunnelError::WatchHandle(format!("triggered run aborted: {}", e))),
        };
        match &outcome {
            Ok(result) if result.is_success() => tracing::info!("rebuild complete, watching for changes..."),
            Ok(_) => tracing::warn!("rebuild finished with failures"),
            Err(e) => tracing::error!("error running tasks: {}", e),
        }
        let _ = self.runs.send(outcome);
    }

    fn set_state(&self, state: WatchState) {
        self.state.send_replace(state);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn join_run(running: &mut Option<RunHandle>) -> Result<RunnelResult<RunResult>, JoinError> {
    match running {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
