//! HTTP server
//!
//! Streaming over Server-Sent Events plus the file listing, download and
//! stats endpoints.

pub mod config;
pub mod error;
pub mod listener;
pub mod routes;

pub use config::ServerConfig;
pub use error::HttpError;
pub use listener::LogServer;
pub use routes::{create_router, AppState};
