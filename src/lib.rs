//! Live log tailing over Server-Sent Events
//!
//! Watches a directory of append-only log files and streams each newly
//! appended line, in order, to every HTTP client subscribed to that file.
//!
//! # Example
//!
//! ```no_run
//! use log_streamer::{LogServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> log_streamer::Result<()> {
//!     let config = ServerConfig::default().log_dir("/var/log/myapp");
//!     LogServer::new(config).run().await
//! }
//! ```
//!
//! # Pipeline
//!
//! ```text
//!  notify event ─► ChangeDetector ─► PassScheduler ─► read_new_lines
//!                                                          │
//!                          StreamSession ◄── Broadcaster ◄─┘
//!                               │
//!                          data: <line>
//! ```

pub mod broadcast;
pub mod error;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod tail;
pub mod watch;

pub use broadcast::{Broadcaster, PublishOutcome};
pub use error::{ConfigError, Error, Result, SessionError};
pub use registry::{RegistryConfig, SubscriberRegistry};
pub use server::{LogServer, ServerConfig};
pub use session::StreamSession;
pub use tail::{LogLine, TrackedFile};
pub use watch::{ChangeDetector, LogFilter};
