//! Delivery statistics for subscribers and the server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Per-subscriber counters
///
/// Shared between the registry-side handle (which records) and the session
/// (which reports at teardown).
#[derive(Debug, Default)]
pub struct SubscriberStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl SubscriberStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Lines accepted into this subscriber's channel
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Lines discarded because the channel stayed full past the send timeout
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Crate-wide tailing and delivery counters
#[derive(Debug, Default)]
pub struct DeliveryStats {
    passes: AtomicU64,
    read_errors: AtomicU64,
    lines_published: AtomicU64,
    lines_delivered: AtomicU64,
    lines_dropped: AtomicU64,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one published line and its per-subscriber fate
    pub fn record_publish(&self, delivered: usize, dropped: usize) {
        self.lines_published.fetch_add(1, Ordering::Relaxed);
        self.lines_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.lines_dropped.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }

    pub fn lines_published(&self) -> u64 {
        self.lines_published.load(Ordering::Relaxed)
    }

    pub fn lines_delivered(&self) -> u64 {
        self.lines_delivered.load(Ordering::Relaxed)
    }

    pub fn lines_dropped(&self) -> u64 {
        self.lines_dropped.load(Ordering::Relaxed)
    }
}

/// Server-wide statistics, as served by `/api/stats`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerStats {
    /// Seconds since the server started
    pub uptime_secs: u64,
    /// Stream sessions currently open
    pub active_sessions: u64,
    /// Stream sessions opened since start
    pub total_sessions: u64,
    /// Subscriber count per filename
    pub subscribers: Vec<FileSubscribers>,
    /// Read passes completed
    pub passes: u64,
    /// Read passes abandoned on I/O errors
    pub read_errors: u64,
    /// Lines handed to the broadcaster
    pub lines_published: u64,
    /// Per-subscriber deliveries
    pub lines_delivered: u64,
    /// Per-subscriber backpressure drops
    pub lines_dropped: u64,
}

/// Subscriber count for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSubscribers {
    pub file: String,
    pub subscribers: usize,
}

/// Session counters kept by the server
#[derive(Debug)]
pub struct SessionCounters {
    started_at: Instant,
    active: AtomicU64,
    total: AtomicU64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            active: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    pub fn session_opened(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for SessionCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerStats {
    /// Assemble a snapshot from the live counters
    pub fn collect(
        sessions: &SessionCounters,
        delivery: &DeliveryStats,
        subscribers: Vec<FileSubscribers>,
    ) -> Self {
        Self {
            uptime_secs: sessions.uptime().as_secs(),
            active_sessions: sessions.active(),
            total_sessions: sessions.total(),
            subscribers,
            passes: delivery.passes(),
            read_errors: delivery.read_errors(),
            lines_published: delivery.lines_published(),
            lines_delivered: delivery.lines_delivered(),
            lines_dropped: delivery.lines_dropped(),
        }
    }
}
