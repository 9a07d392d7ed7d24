//! Subscriber registry for pub/sub routing
//!
//! The registry maps each filename to the subscribers currently streaming
//! it. Each subscriber owns a small bounded channel; the registry keeps only
//! the sending half, so a session ends its subscription by deregistering and
//! dropping its receiver.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<SubscriberRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ subscribers: HashMap<file,   │
//!                  │   Vec<SubscriberHandle {     │
//!                  │     tx: mpsc::Sender,        │
//!                  │   }>                         │
//!                  │ >                            │
//!                  └──────────────┬───────────────┘
//!                                 │ snapshot()
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Broadcaster]          [StreamSession]         [StreamSession]
//!    publish(file, line)    subscriber.recv()       subscriber.recv()
//!         │                       │                       │
//!         └──► handle.deliver() ──┴──► data: <line> ──► HTTP
//! ```
//!
//! # Zero-Copy Design
//!
//! Lines are `bytes::Bytes`-backed, so delivering one line to many
//! subscribers clones a reference count, not the data.

pub mod config;
pub mod store;
pub mod subscriber;

pub use config::RegistryConfig;
pub use store::SubscriberRegistry;
pub use subscriber::{Delivery, Subscriber, SubscriberHandle, SubscriberId};
