//! Subscriber registry implementation
//!
//! Maps filenames to the subscribers currently streaming them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::config::RegistryConfig;
use super::subscriber::{Subscriber, SubscriberHandle, SubscriberId};
use crate::stats::FileSubscribers;

type SubscriberMap = HashMap<String, Vec<SubscriberHandle>>;

/// Registry of active subscribers, keyed by filename
///
/// All operations serialize on one mutex. It is held only for in-memory
/// set mutation or copying a snapshot, never across a send or an await,
/// and is synchronous so deregistration can run from `Drop`.
pub struct SubscriberRegistry {
    /// Map of filename to registered subscribers
    subscribers: Mutex<SubscriberMap>,

    /// Next subscriber ID to hand out
    next_id: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, SubscriberMap> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a fresh subscriber ID
    pub fn next_id(&self) -> SubscriberId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a subscriber for `filename` and register its handle
    pub fn subscribe(&self, filename: &str) -> Subscriber {
        let (subscriber, handle) =
            Subscriber::channel(self.next_id(), filename, self.config.delivery_capacity);
        self.register(filename, handle);
        subscriber
    }

    /// Add a subscriber handle under `filename`
    pub fn register(&self, filename: &str, handle: SubscriberHandle) {
        let id = handle.id();
        let count = {
            let mut subscribers = self.lock();
            let entry = subscribers.entry(filename.to_string()).or_default();
            if !entry.iter().any(|h| h.id() == id) {
                entry.push(handle);
            }
            entry.len()
        };

        tracing::info!(
            file = %filename,
            subscriber_id = id,
            subscribers = count,
            "Subscriber added"
        );
    }

    /// Remove a subscriber by identity
    ///
    /// Returns `false` if it was not registered; removing twice is harmless.
    pub fn deregister(&self, filename: &str, id: SubscriberId) -> bool {
        let (removed, remaining) = {
            let mut subscribers = self.lock();
            match subscribers.get_mut(filename) {
                Some(entry) => {
                    let before = entry.len();
                    entry.retain(|h| h.id() != id);
                    let removed = entry.len() != before;
                    let remaining = entry.len();
                    if remaining == 0 {
                        subscribers.remove(filename);
                    }
                    (removed, remaining)
                }
                None => (false, 0),
            }
        };

        if removed {
            tracing::info!(
                file = %filename,
                subscriber_id = id,
                subscribers = remaining,
                "Subscriber removed"
            );
        }
        removed
    }

    /// Copy of the current subscriber set for `filename`
    ///
    /// Handles whose subscriber has been dropped are pruned first. Delivery
    /// iterates the copy outside the lock.
    pub fn snapshot(&self, filename: &str) -> Vec<SubscriberHandle> {
        let (handles, pruned) = {
            let mut subscribers = self.lock();
            let Some(entry) = subscribers.get_mut(filename) else {
                return Vec::new();
            };
            let before = entry.len();
            entry.retain(|h| !h.is_closed());
            let pruned = before - entry.len();
            let handles = entry.clone();
            if handles.is_empty() {
                subscribers.remove(filename);
            }
            (handles, pruned)
        };

        if pruned > 0 {
            tracing::debug!(file = %filename, pruned = pruned, "Pruned closed subscribers");
        }
        handles
    }

    /// Number of subscribers for `filename`
    pub fn subscriber_count(&self, filename: &str) -> usize {
        self.lock().get(filename).map_or(0, Vec::len)
    }

    /// Subscriber counts for every filename with at least one subscriber
    pub fn file_counts(&self) -> Vec<FileSubscribers> {
        let mut counts: Vec<FileSubscribers> = self
            .lock()
            .iter()
            .map(|(file, handles)| FileSubscribers {
                file: file.clone(),
                subscribers: handles.len(),
            })
            .collect();
        counts.sort_by(|a, b| a.file.cmp(&b.file));
        counts
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_snapshot() {
        let registry = SubscriberRegistry::new();
        let a = registry.subscribe("a.log");
        let b = registry.subscribe("a.log");
        let _c = registry.subscribe("b.log");

        let ids: Vec<_> = registry.snapshot("a.log").iter().map(|h| h.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
        assert_eq!(registry.subscriber_count("b.log"), 1);
        assert!(registry.snapshot("c.log").is_empty());
    }

    #[test]
    fn test_ids_unique() {
        let registry = SubscriberRegistry::new();
        let a = registry.subscribe("a.log");
        let b = registry.subscribe("a.log");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_register_same_handle_once() {
        let registry = SubscriberRegistry::new();
        let (_subscriber, handle) = Subscriber::channel(registry.next_id(), "a.log", 1);

        registry.register("a.log", handle.clone());
        registry.register("a.log", handle);

        assert_eq!(registry.subscriber_count("a.log"), 1);
    }

    #[test]
    fn test_deregister_idempotent() {
        let registry = SubscriberRegistry::new();
        let a = registry.subscribe("a.log");
        let b = registry.subscribe("a.log");

        assert!(registry.deregister("a.log", a.id()));
        let after_once: Vec<_> = registry.snapshot("a.log").iter().map(|h| h.id()).collect();

        assert!(!registry.deregister("a.log", a.id()));
        let after_twice: Vec<_> = registry.snapshot("a.log").iter().map(|h| h.id()).collect();

        assert_eq!(after_once, after_twice);
        assert_eq!(after_twice, vec![b.id()]);
    }

    #[test]
    fn test_deregister_wrong_file_is_noop() {
        let registry = SubscriberRegistry::new();
        let a = registry.subscribe("a.log");

        assert!(!registry.deregister("b.log", a.id()));
        assert_eq!(registry.subscriber_count("a.log"), 1);
    }

    #[test]
    fn test_empty_entries_removed() {
        let registry = SubscriberRegistry::new();
        let a = registry.subscribe("a.log");
        let _b = registry.subscribe("b.log");

        registry.deregister("a.log", a.id());

        let files: Vec<_> = registry.file_counts().into_iter().map(|f| f.file).collect();
        assert_eq!(files, vec!["b.log"]);
    }

    #[test]
    fn test_snapshot_prunes_dropped_subscribers() {
        let registry = SubscriberRegistry::new();
        let dropped = registry.subscribe("a.log");
        let kept = registry.subscribe("a.log");
        let orphan = registry.subscribe("b.log");
        drop(dropped);
        drop(orphan);

        let ids: Vec<_> = registry.snapshot("a.log").iter().map(|h| h.id()).collect();
        assert_eq!(ids, vec![kept.id()]);
        assert!(registry.snapshot("b.log").is_empty());
        assert_eq!(registry.subscriber_count("a.log"), 1);
        assert_eq!(registry.subscriber_count("b.log"), 0);
    }

    #[test]
    fn test_subscribe_uses_configured_capacity() {
        let registry =
            SubscriberRegistry::with_config(RegistryConfig::default().delivery_capacity(4));
        assert_eq!(registry.config().delivery_capacity, 4);
        let _a = registry.subscribe("a.log");
        assert_eq!(registry.subscriber_count("a.log"), 1);
    }
}
