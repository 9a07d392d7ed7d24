//! Session context
//!
//! Identity of a stream session, carried into log records.

use std::net::SocketAddr;

use crate::registry::SubscriberId;

/// Who is streaming what
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID (the subscriber ID)
    pub session_id: SubscriberId,

    /// Requested log filename
    pub filename: String,

    /// Remote peer address, when the transport knows it
    pub peer_addr: Option<SocketAddr>,
}

impl SessionContext {
    /// Create a new context
    pub fn new(session_id: SubscriberId, filename: impl Into<String>) -> Self {
        Self {
            session_id,
            filename: filename.into(),
            peer_addr: None,
        }
    }
}
