//! Per-file pass scheduling
//!
//! At most one read pass runs per file. The file's [`TrackedFile`] is moved
//! into the running pass and handed back when it finishes, so the offset has
//! a single writer without needing a lock of its own. Triggers that arrive
//! while a pass is running are coalesced into one follow-up pass.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::broadcast::Broadcaster;
use crate::tail::{read_new_lines, TrackedFile};

/// Scheduling state of one file
#[derive(Debug)]
enum Slot {
    /// No pass running; the cursor is parked here
    Idle(TrackedFile),
    /// A pass holds the cursor; `rerun` asks for one more pass afterwards
    Running { rerun: bool },
}

struct Inner {
    dir: PathBuf,
    slots: Mutex<HashMap<String, Slot>>,
    broadcaster: Broadcaster,
}

/// Runs tail passes, serialized per filename
#[derive(Clone)]
pub struct PassScheduler {
    inner: Arc<Inner>,
}

impl PassScheduler {
    /// Create a scheduler for files in `dir`
    pub fn new(dir: impl Into<PathBuf>, broadcaster: Broadcaster) -> Self {
        Self {
            inner: Arc::new(Inner {
                dir: dir.into(),
                slots: Mutex::new(HashMap::new()),
                broadcaster,
            }),
        }
    }

    /// Request a pass over `name`
    ///
    /// Starts a pass if none is running and returns its task. If one is
    /// already running, marks it for a rerun and returns `None`.
    pub fn trigger(&self, name: &str) -> Option<JoinHandle<()>> {
        let tracked = {
            let mut slots = self.inner.lock();
            let slot = slots
                .entry(name.to_string())
                .or_insert_with(|| Slot::Idle(TrackedFile::new(name, self.inner.dir.join(name))));

            match std::mem::replace(slot, Slot::Running { rerun: false }) {
                Slot::Idle(tracked) => tracked,
                Slot::Running { .. } => {
                    *slot = Slot::Running { rerun: true };
                    tracing::trace!(file = %name, "Pass in flight, coalescing trigger");
                    return None;
                }
            }
        };

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(inner.run(tracked)))
    }

    /// Offset of `name` if it is tracked and no pass is running
    pub fn current_offset(&self, name: &str) -> Option<u64> {
        match self.inner.lock().get(name) {
            Some(Slot::Idle(tracked)) => Some(tracked.current_offset()),
            _ => None,
        }
    }

    /// Whether a pass over `name` is in flight
    pub fn is_running(&self, name: &str) -> bool {
        matches!(self.inner.lock().get(name), Some(Slot::Running { .. }))
    }

    /// Number of files seen so far
    pub fn tracked_count(&self) -> usize {
        self.inner.lock().len()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run passes until no rerun was requested, then park the cursor
    async fn run(self: Arc<Self>, tracked: TrackedFile) {
        let name = tracked.name().to_string();
        let mut tracked = tracked;

        loop {
            let done = self.pass(tracked).await;

            let next = {
                let mut slots = self.lock();
                let slot = slots
                    .entry(name.clone())
                    .or_insert(Slot::Running { rerun: false });
                if let Slot::Running { rerun: true } = slot {
                    *slot = Slot::Running { rerun: false };
                    Some(done)
                } else {
                    *slot = Slot::Idle(done);
                    None
                }
            };

            match next {
                Some(again) => tracked = again,
                None => break,
            }
        }
    }

    /// Read new lines and publish them in file order
    async fn pass(&self, tracked: TrackedFile) -> TrackedFile {
        let name = tracked.name().to_string();
        let before = tracked.clone();
        let stats = self.broadcaster.stats();

        let joined = tokio::task::spawn_blocking(move || {
            let mut tracked = tracked;
            let result = read_new_lines(&mut tracked);
            (tracked, result)
        })
        .await;

        match joined {
            Ok((tracked, Ok(outcome))) => {
                stats.record_pass();
                tracing::debug!(
                    file = %name,
                    lines = outcome.lines.len(),
                    consumed = outcome.consumed,
                    offset = tracked.current_offset(),
                    "Tail pass complete"
                );
                if !outcome.lines.is_empty() {
                    self.broadcaster.publish_all(&name, outcome.lines).await;
                }
                tracked
            }
            Ok((tracked, Err(e))) => {
                stats.record_read_error();
                tracing::warn!(
                    file = %name,
                    error = %e,
                    offset = tracked.current_offset(),
                    "Tail pass abandoned"
                );
                tracked
            }
            Err(e) => {
                stats.record_read_error();
                tracing::error!(file = %name, error = %e, "Tail pass task failed");
                before
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::registry::SubscriberRegistry;

    fn append(path: &Path, data: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(data.as_bytes()).unwrap();
    }

    fn setup(dir: &Path) -> (PassScheduler, Arc<SubscriberRegistry>) {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        (PassScheduler::new(dir, broadcaster), registry)
    }

    #[tokio::test]
    async fn test_pass_publishes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, registry) = setup(dir.path());
        let mut subscriber = registry.subscribe("app.log");

        append(&dir.path().join("app.log"), "hello\n");
        let reader = tokio::spawn(async move { subscriber.recv().await });

        scheduler.trigger("app.log").unwrap().await.unwrap();

        let line = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(line.to_text(), "hello");
        assert_eq!(scheduler.current_offset("app.log"), Some(6));
    }

    #[tokio::test]
    async fn test_triggers_coalesce() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, _registry) = setup(dir.path());
        let path = dir.path().join("app.log");
        append(&path, "one\n");

        let first = scheduler.trigger("app.log").unwrap();
        assert!(scheduler.is_running("app.log"));

        append(&path, "two\n");
        assert!(scheduler.trigger("app.log").is_none());
        assert!(scheduler.trigger("app.log").is_none());

        first.await.unwrap();

        assert!(!scheduler.is_running("app.log"));
        assert_eq!(scheduler.current_offset("app.log"), Some(8));
        assert_eq!(scheduler.tracked_count(), 1);
    }

    #[tokio::test]
    async fn test_coalesced_pass_delivers_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, registry) = setup(dir.path());
        let path = dir.path().join("app.log");
        let mut subscriber = registry.subscribe("app.log");

        let reader = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(line) = subscriber.recv().await {
                seen.push(line.to_text().into_owned());
                if seen.len() == 3 {
                    break;
                }
            }
            seen
        });

        append(&path, "a\nb\n");
        let first = scheduler.trigger("app.log").unwrap();
        append(&path, "c\n");
        scheduler.trigger("app.log");
        first.await.unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let stats = Arc::clone(broadcaster.stats());
        let scheduler = PassScheduler::new(dir.path(), broadcaster);

        scheduler.trigger("gone.log").unwrap().await.unwrap();
        assert_eq!(stats.read_errors(), 1);
        assert_eq!(scheduler.current_offset("gone.log"), Some(0));

        append(&dir.path().join("gone.log"), "back\n");
        scheduler.trigger("gone.log").unwrap().await.unwrap();
        assert_eq!(stats.passes(), 1);
        assert_eq!(scheduler.current_offset("gone.log"), Some(5));
    }

    #[tokio::test]
    async fn test_files_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, _registry) = setup(dir.path());
        append(&dir.path().join("a.log"), "a\n");
        append(&dir.path().join("b.log"), "bb\n");

        let a = scheduler.trigger("a.log").unwrap();
        let b = scheduler.trigger("b.log").unwrap();
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(scheduler.current_offset("a.log"), Some(2));
        assert_eq!(scheduler.current_offset("b.log"), Some(3));
    }
}
