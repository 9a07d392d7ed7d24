//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::registry::RegistryConfig;
use crate::watch::LogFilter;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Directory whose log files are tailed and served
    pub log_dir: PathBuf,

    /// Filename suffix that marks a log file
    pub suffix: String,

    /// Per-subscriber channel capacity
    pub delivery_capacity: usize,

    /// How long delivery waits on a slow subscriber before dropping a line
    pub send_timeout: Duration,

    /// Interval between SSE keep-alive comments
    pub keep_alive_interval: Duration,

    /// Maximum concurrent stream sessions (0 = unlimited)
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_dir: PathBuf::from("/tmp/local"),
            suffix: ".log".to_string(),
            delivery_capacity: 1,
            send_timeout: Duration::from_secs(1),
            keep_alive_interval: Duration::from_secs(15),
            max_connections: 0, // Unlimited
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Defaults overridden by `LOG_STREAMER_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// Recognized keys: `LOG_STREAMER_ADDR`, `LOG_STREAMER_DIR`,
    /// `LOG_STREAMER_SUFFIX`, `LOG_STREAMER_SEND_TIMEOUT_MS`,
    /// `LOG_STREAMER_CHANNEL_CAPACITY`, `LOG_STREAMER_MAX_CONNECTIONS`.
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = parse_var(&lookup, "LOG_STREAMER_ADDR")? {
            self.bind_addr = addr;
        }
        if let Some(dir) = lookup("LOG_STREAMER_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(suffix) = lookup("LOG_STREAMER_SUFFIX") {
            self.suffix = suffix;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "LOG_STREAMER_SEND_TIMEOUT_MS")? {
            self.send_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = parse_var::<usize, _>(&lookup, "LOG_STREAMER_CHANNEL_CAPACITY")? {
            if capacity == 0 {
                return Err(ConfigError::ZeroCapacity);
            }
            self.delivery_capacity = capacity;
        }
        if let Some(max) = parse_var(&lookup, "LOG_STREAMER_MAX_CONNECTIONS")? {
            self.max_connections = max;
        }
        Ok(self)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the watched directory
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the log filename suffix
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set per-subscriber channel capacity (at least 1)
    pub fn delivery_capacity(mut self, capacity: usize) -> Self {
        self.delivery_capacity = capacity.max(1);
        self
    }

    /// Set the slow-subscriber send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the SSE keep-alive interval
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    /// Set maximum concurrent stream sessions
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Delivery settings for the subscriber registry
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default()
            .delivery_capacity(self.delivery_capacity)
            .send_timeout(self.send_timeout)
    }

    /// Filename filter for the configured suffix
    pub fn filter(&self) -> LogFilter {
        LogFilter::new(self.suffix.clone())
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/local"));
        assert_eq!(config.suffix, ".log");
        assert_eq!(config.delivery_capacity, 1);
        assert_eq!(config.send_timeout, Duration::from_secs(1));
        assert_eq!(config.max_connections, 0);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9090);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .log_dir("/var/log/app")
            .suffix(".txt")
            .delivery_capacity(0)
            .send_timeout(Duration::from_millis(250))
            .keep_alive_interval(Duration::from_secs(5))
            .max_connections(50);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/app"));
        assert_eq!(config.suffix, ".txt");
        assert_eq!(config.delivery_capacity, 1);
        assert_eq!(config.send_timeout, Duration::from_millis(250));
        assert_eq!(config.keep_alive_interval, Duration::from_secs(5));
        assert_eq!(config.max_connections, 50);
    }

    #[test]
    fn test_registry_config_and_filter() {
        let config = ServerConfig::default()
            .delivery_capacity(4)
            .send_timeout(Duration::from_millis(10))
            .suffix(".out");

        let registry = config.registry_config();
        assert_eq!(registry.delivery_capacity, 4);
        assert_eq!(registry.send_timeout, Duration::from_millis(10));
        assert!(config.filter().matches("job.out"));
    }

    #[test]
    fn test_apply_vars() {
        let config = ServerConfig::default()
            .apply_vars(vars(&[
                ("LOG_STREAMER_ADDR", "127.0.0.1:3000"),
                ("LOG_STREAMER_DIR", "/srv/logs"),
                ("LOG_STREAMER_SEND_TIMEOUT_MS", "500"),
                ("LOG_STREAMER_CHANNEL_CAPACITY", "2"),
                ("LOG_STREAMER_MAX_CONNECTIONS", "10"),
            ]))
            .unwrap();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.log_dir, PathBuf::from("/srv/logs"));
        assert_eq!(config.send_timeout, Duration::from_millis(500));
        assert_eq!(config.delivery_capacity, 2);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.suffix, ".log");
    }

    #[test]
    fn test_apply_vars_invalid() {
        let result = ServerConfig::default().apply_vars(vars(&[("LOG_STREAMER_ADDR", "nowhere")]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidValue {
                var: "LOG_STREAMER_ADDR",
                value: "nowhere".into()
            }
        );
    }

    #[test]
    fn test_apply_vars_zero_capacity() {
        let result =
            ServerConfig::default().apply_vars(vars(&[("LOG_STREAMER_CHANNEL_CAPACITY", "0")]));
        assert_eq!(result.unwrap_err(), ConfigError::ZeroCapacity);
    }
}
