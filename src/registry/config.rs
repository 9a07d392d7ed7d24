//! Registry and delivery configuration

use std::time::Duration;

/// Per-subscriber delivery settings
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of each subscriber's line channel (at least 1)
    pub delivery_capacity: usize,

    /// How long a publish waits on a full channel before dropping the line
    pub send_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            delivery_capacity: 1,
            send_timeout: Duration::from_secs(1),
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber channel capacity
    ///
    /// Values below 1 are raised to 1.
    pub fn delivery_capacity(mut self, capacity: usize) -> Self {
        self.delivery_capacity = capacity.max(1);
        self
    }

    /// Set the send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}
