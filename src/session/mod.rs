//! Stream sessions
//!
//! A session is the per-connection lifecycle: validate the requested
//! filename, register a subscriber, relay delivered lines, deregister.

pub mod context;
pub mod state;
pub mod stream;

pub use context::SessionContext;
pub use state::{SessionPhase, SessionState};
pub use stream::{event_text, StreamSession};
