//! Sources of file change events
//!
//! A [`WatchBackend`] owns whatever OS resources deliver change
//! notifications. Dropping the backend releases them.

use std::path::PathBuf;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use crate::types::{RunnelError, RunnelResult};

pub type ChangeSender = UnboundedSender<PathBuf>;

pub trait WatchBackend: Send {
    /// Begin delivering changed paths under `roots` into `changes`.
    fn start(&mut self, roots: &[PathBuf], changes: ChangeSender) -> RunnelResult<()>;
}

/// Backend built on the platform's recommended `notify` watcher
#[derive(Default)]
pub struct NotifyBackend {
    watcher: Option<RecommendedWatcher>,
}

impl NotifyBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatchBackend for NotifyBackend {
    fn start(&mut self, roots: &[PathBuf], changes: ChangeSender) -> RunnelResult<()> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    if !matches!(
                        event.kind,
                        EventKind::Create(..) | EventKind::Modify(..) | EventKind::Remove(..)
                    ) {
                        return;
                    }
                    for path in event.paths {
                        // The receiver is gone once the watch has stopped
                        let _ = changes.send(path);
                    }
                }
                Err(e) => tracing::error!("watch error: {:?}", e),
            }
        })
        .map_err(|e| RunnelError::WatchHandle(format!("Failed to create file watcher: {}", e)))?;

        for root in roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| {
                    RunnelError::WatchHandle(format!("Failed to watch {}: {}", root.display(), e))
                })?;
            tracing::info!("watching {}", root.display());
        }

        self.watcher = Some(watcher);
        Ok(())
    }
}

impl Drop for NotifyBackend {
    fn drop(&mut self) {
        if self.watcher.take().is_some() {
            tracing::debug!("released file watcher");
        }
    }
}
