//! Statistics and metrics

pub mod metrics;

pub use metrics::{
    DeliveryStats, FileSubscribers, ServerStats, SessionCounters, SubscriberStats,
};
