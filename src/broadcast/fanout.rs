//! Broadcaster implementation

use std::sync::Arc;

use futures_util::future::join_all;

use crate::registry::{Delivery, SubscriberRegistry};
use crate::stats::DeliveryStats;
use crate::tail::LogLine;

/// Per-subscriber results of publishing one or more lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Deliveries accepted into subscriber channels
    pub delivered: usize,
    /// Deliveries dropped after the send timeout
    pub dropped: usize,
    /// Subscribers that went away mid-delivery; deregistered on the spot
    pub closed: usize,
}

impl PublishOutcome {
    fn merge(&mut self, other: PublishOutcome) {
        self.delivered += other.delivered;
        self.dropped += other.dropped;
        self.closed += other.closed;
    }
}

/// Delivers lines to the subscribers of a file
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    stats: Arc<DeliveryStats>,
}

impl Broadcaster {
    /// Create a broadcaster over `registry` with fresh counters
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self::with_stats(registry, Arc::new(DeliveryStats::new()))
    }

    /// Create a broadcaster that records into shared counters
    pub fn with_stats(registry: Arc<SubscriberRegistry>, stats: Arc<DeliveryStats>) -> Self {
        Self { registry, stats }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<DeliveryStats> {
        &self.stats
    }

    /// Offer `line` to every subscriber currently registered for `filename`
    ///
    /// Subscribers are served concurrently, each with an immediate send
    /// followed by a bounded wait. Returns once every subscriber has either
    /// accepted the line or had it dropped.
    pub async fn publish(&self, filename: &str, line: LogLine) -> PublishOutcome {
        let handles = self.registry.snapshot(filename);
        let timeout = self.registry.config().send_timeout;

        let results = join_all(
            handles
                .iter()
                .map(|handle| handle.deliver(line.clone(), timeout)),
        )
        .await;

        let mut outcome = PublishOutcome::default();
        for (handle, result) in handles.iter().zip(results) {
            match result {
                Delivery::Delivered => outcome.delivered += 1,
                Delivery::Dropped => {
                    outcome.dropped += 1;
                    tracing::warn!(
                        file = %filename,
                        subscriber_id = handle.id(),
                        dropped_total = handle.stats().dropped(),
                        "Subscriber too slow, line dropped"
                    );
                }
                Delivery::Closed => {
                    outcome.closed += 1;
                    self.registry.deregister(filename, handle.id());
                }
            }
        }

        self.stats.record_publish(outcome.delivered, outcome.dropped);
        outcome
    }

    /// Publish lines in order
    ///
    /// Each line settles for all subscribers before the next is offered, so
    /// every subscriber sees the file's lines in file order.
    pub async fn publish_all(
        &self,
        filename: &str,
        lines: impl IntoIterator<Item = LogLine>,
    ) -> PublishOutcome {
        let mut total = PublishOutcome::default();
        for line in lines {
            total.merge(self.publish(filename, line).await);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::registry::RegistryConfig;

    fn registry(capacity: usize, timeout_ms: u64) -> Arc<SubscriberRegistry> {
        Arc::new(SubscriberRegistry::with_config(
            RegistryConfig::default()
                .delivery_capacity(capacity)
                .send_timeout(Duration::from_millis(timeout_ms)),
        ))
    }

    #[tokio::test]
    async fn test_fan_out() {
        let registry = registry(1, 100);
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let mut subscribers: Vec<_> = (0..3).map(|_| registry.subscribe("a.log")).collect();
        let mut other = registry.subscribe("b.log");

        let outcome = broadcaster.publish("a.log", LogLine::from("x")).await;
        assert_eq!(outcome.delivered, 3);

        for subscriber in &mut subscribers {
            assert_eq!(subscriber.try_recv().unwrap().to_text(), "x");
        }
        assert!(other.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let registry = registry(1, 100);
        let broadcaster = Broadcaster::new(registry);

        let outcome = broadcaster.publish("a.log", LogLine::from("x")).await;
        assert_eq!(outcome, PublishOutcome::default());
        assert_eq!(broadcaster.stats().lines_published(), 1);
    }

    #[tokio::test]
    async fn test_slow_subscriber_isolated() {
        let registry = registry(1, 50);
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let slow = registry.subscribe("a.log");
        let mut healthy = registry.subscribe("a.log");

        let reader = tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..3 {
                seen.push(healthy.recv().await.unwrap().to_text().into_owned());
            }
            seen
        });

        let started = Instant::now();
        let outcome = broadcaster
            .publish_all(
                "a.log",
                vec![LogLine::from("1"), LogLine::from("2"), LogLine::from("3")],
            )
            .await;

        // The slow subscriber holds "1" and drops the rest.
        assert_eq!(outcome.dropped, 2);
        assert_eq!(slow.stats().dropped(), 2);
        assert_eq!(slow.stats().delivered(), 1);
        assert!(started.elapsed() < Duration::from_secs(2));

        let seen = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen, vec!["1", "2", "3"]);
        assert_eq!(broadcaster.stats().lines_dropped(), 2);
    }

    #[tokio::test]
    async fn test_fifo_per_subscriber() {
        let registry = registry(16, 100);
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let mut subscriber = registry.subscribe("a.log");

        let lines: Vec<LogLine> = (0..10).map(|i| LogLine::from(i.to_string())).collect();
        broadcaster.publish_all("a.log", lines).await;

        for i in 0..10 {
            assert_eq!(subscriber.try_recv().unwrap().to_text(), i.to_string());
        }
    }

    #[tokio::test]
    async fn test_dropped_subscribers_pruned() {
        let registry = registry(1, 100);
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let gone: Vec<_> = (0..100).map(|_| registry.subscribe("a.log")).collect();
        let mut live = registry.subscribe("a.log");
        drop(gone);

        for _ in 0..3 {
            let outcome = broadcaster.publish("a.log", LogLine::from("x")).await;
            assert_eq!(outcome.delivered, 1);
            assert_eq!(outcome.closed, 0);
            assert_eq!(outcome.dropped, 0);
            live.recv().await.unwrap();
        }
        assert_eq!(registry.subscriber_count("a.log"), 1);

        drop(live);
        broadcaster.publish("a.log", LogLine::from("x")).await;
        assert_eq!(registry.subscriber_count("a.log"), 0);
        assert!(registry.file_counts().is_empty());
    }
}
