//! Subscriber endpoints
//!
//! A subscriber is a bounded single-consumer channel. The receiving half
//! ([`Subscriber`]) is owned by the stream session; the sending half
//! ([`SubscriberHandle`]) sits in the registry and is only used for lookup
//! and delivery, never to control the session's lifetime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::stats::SubscriberStats;
use crate::tail::LogLine;

/// Opaque subscriber identifier, unique per registry
pub type SubscriberId = u64;

/// Fate of one line offered to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Line accepted into the channel
    Delivered,
    /// Channel stayed full past the timeout; line discarded for this subscriber
    Dropped,
    /// The session is gone and has not deregistered yet
    Closed,
}

/// Receiving side of a subscription
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    filename: String,
    rx: mpsc::Receiver<LogLine>,
    stats: Arc<SubscriberStats>,
}

/// Registry-side reference used to deliver lines
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    tx: mpsc::Sender<LogLine>,
    stats: Arc<SubscriberStats>,
}

impl Subscriber {
    /// Create a subscriber and its delivery handle
    pub fn channel(
        id: SubscriberId,
        filename: impl Into<String>,
        capacity: usize,
    ) -> (Subscriber, SubscriberHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(SubscriberStats::new());

        let subscriber = Subscriber {
            id,
            filename: filename.into(),
            rx,
            stats: Arc::clone(&stats),
        };
        let handle = SubscriberHandle { id, tx, stats };

        (subscriber, handle)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Filename this subscriber is registered under
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn stats(&self) -> &SubscriberStats {
        &self.stats
    }

    /// Wait for the next line
    ///
    /// Returns `None` once every handle has been dropped.
    pub async fn recv(&mut self) -> Option<LogLine> {
        self.rx.recv().await
    }

    /// Take a line if one is already queued
    pub fn try_recv(&mut self) -> Option<LogLine> {
        self.rx.try_recv().ok()
    }
}

impl SubscriberHandle {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn stats(&self) -> &SubscriberStats {
        &self.stats
    }

    /// Offer a line with a bounded wait
    ///
    /// Tries an immediate send first. If the channel is full, waits up to
    /// `timeout` for room and drops the line if none frees up.
    pub async fn deliver(&self, line: LogLine, timeout: Duration) -> Delivery {
        let outcome = match self.tx.try_send(line) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
            Err(TrySendError::Full(line)) => {
                match tokio::time::timeout(timeout, self.tx.send(line)).await {
                    Ok(Ok(())) => Delivery::Delivered,
                    Ok(Err(_)) => Delivery::Closed,
                    Err(_) => Delivery::Dropped,
                }
            }
        };

        match outcome {
            Delivery::Delivered => self.stats.record_delivered(),
            Delivery::Dropped => self.stats.record_dropped(),
            Delivery::Closed => {}
        }
        outcome
    }

    /// Whether the receiving session has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
