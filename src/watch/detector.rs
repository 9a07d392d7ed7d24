//! Directory change detector
//!
//! Scans the watched directory once at startup, then turns filesystem write
//! notifications for log files into tail passes.

use std::io;
use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::filter::LogFilter;
use super::scheduler::PassScheduler;
use crate::broadcast::Broadcaster;

/// Watches one directory and schedules tail passes for its log files
pub struct ChangeDetector {
    dir: PathBuf,
    filter: LogFilter,
    scheduler: PassScheduler,
}

/// Handle to a running detector task
pub struct WatchHandle {
    task: JoinHandle<()>,
    cancel: CancellationToken,
    scheduler: PassScheduler,
}

impl ChangeDetector {
    /// Create a detector for `dir`, publishing through `broadcaster`
    pub fn new(dir: impl Into<PathBuf>, filter: LogFilter, broadcaster: Broadcaster) -> Self {
        let dir = dir.into();
        let scheduler = PassScheduler::new(dir.clone(), broadcaster);
        Self {
            dir,
            filter,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &PassScheduler {
        &self.scheduler
    }

    /// Schedule one pass per existing log file
    ///
    /// Returns the number of files scheduled.
    pub async fn initial_scan(&self) -> io::Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut scheduled = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = self.filter.match_path(&entry.path()) {
                self.scheduler.trigger(&name);
                scheduled += 1;
            }
        }
        Ok(scheduled)
    }

    /// Schedule passes for the log files a notification refers to
    ///
    /// Returns the number of triggers issued.
    pub async fn handle_event(&self, event: &Event) -> usize {
        if !is_write(&event.kind) {
            return 0;
        }

        let mut triggered = 0;
        for path in &event.paths {
            let Some(name) = self.filter.match_path(path) else {
                continue;
            };
            if is_dir(path).await {
                continue;
            }
            tracing::trace!(file = %name, kind = ?event.kind, "Write event");
            self.scheduler.trigger(&name);
            triggered += 1;
        }
        triggered
    }

    /// Establish the watch, scan existing files and process events
    ///
    /// If the watch cannot be established the error is logged and the
    /// detector keeps running without notifications: files from the initial
    /// scan are still tailed once, but new writes go unnoticed.
    pub fn start(self, cancel: CancellationToken) -> WatchHandle {
        let scheduler = self.scheduler.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { self.run(task_cancel).await });

        WatchHandle {
            task,
            cancel,
            scheduler,
        }
    }

    async fn run(self, cancel: CancellationToken) {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        // Kept alive for the lifetime of the loop; dropping it stops notifications.
        let _watcher = match self.watch(event_tx) {
            Ok(watcher) => {
                tracing::info!(dir = %self.dir.display(), "Watching log directory");
                Some(watcher)
            }
            Err(e) => {
                tracing::error!(
                    dir = %self.dir.display(),
                    error = %e,
                    "Failed to watch log directory, new writes will not be tailed"
                );
                None
            }
        };

        match self.initial_scan().await {
            Ok(count) => tracing::info!(files = count, "Initial scan scheduled"),
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "Initial scan failed")
            }
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = event_rx.recv() => match received {
                    Some(Ok(event)) => {
                        self.handle_event(&event).await;
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Watcher error");
                    }
                    None => {
                        // Watch never established; idle until shutdown.
                        cancel.cancelled().await;
                        break;
                    }
                },
            }
        }

        tracing::info!(dir = %self.dir.display(), "Change detector stopped");
    }

    fn watch(
        &self,
        event_tx: mpsc::UnboundedSender<notify::Result<Event>>,
    ) -> notify::Result<RecommendedWatcher> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }
}

impl WatchHandle {
    pub fn scheduler(&self) -> &PassScheduler {
        &self.scheduler
    }

    /// Stop the detector and wait for its task to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Change detector task failed");
        }
    }
}

/// Whether `path` names a directory; a missing path is not one
async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Whether an event kind can mean new bytes in a file
fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(
                ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Name(RenameMode::To)
            )
    )
}
