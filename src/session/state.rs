//! Session state machine
//!
//! Tracks a stream session from request validation to teardown.

use std::time::{Duration, Instant};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Request received, filename not yet validated
    Init,
    /// Subscriber registered, nothing relayed yet
    Subscribed,
    /// Waiting on lines or cancellation
    Streaming,
    /// Subscriber deregistered; terminal
    Teardown,
}

/// Lifecycle state of one stream session
#[derive(Debug)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,

    /// When the request arrived
    pub opened_at: Instant,

    /// Lines relayed to the connection
    pub lines_relayed: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Init,
            opened_at: Instant::now(),
            lines_relayed: 0,
        }
    }

    /// Filename accepted and subscriber registered
    pub fn on_subscribed(&mut self) {
        if self.phase == SessionPhase::Init {
            self.phase = SessionPhase::Subscribed;
        }
    }

    /// Enter the streaming loop
    ///
    /// Returns `false` if the session has already been torn down.
    pub fn start_streaming(&mut self) -> bool {
        match self.phase {
            SessionPhase::Subscribed | SessionPhase::Streaming => {
                self.phase = SessionPhase::Streaming;
                true
            }
            SessionPhase::Init | SessionPhase::Teardown => false,
        }
    }

    /// Count a relayed line
    pub fn on_relayed(&mut self) {
        self.lines_relayed += 1;
    }

    /// Move to teardown
    ///
    /// Returns `true` only for the first call.
    pub fn teardown(&mut self) -> bool {
        let first = self.phase != SessionPhase::Teardown;
        self.phase = SessionPhase::Teardown;
        first
    }

    /// Check if the session is torn down
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Teardown
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut state = SessionState::new();
        assert_eq!(state.phase, SessionPhase::Init);
        assert!(!state.start_streaming());

        state.on_subscribed();
        assert_eq!(state.phase, SessionPhase::Subscribed);

        assert!(state.start_streaming());
        assert_eq!(state.phase, SessionPhase::Streaming);
        assert!(state.start_streaming());

        state.on_relayed();
        assert_eq!(state.lines_relayed, 1);

        assert!(state.teardown());
        assert!(state.is_closed());
    }

    #[test]
    fn test_teardown_once() {
        let mut state = SessionState::new();
        state.on_subscribed();

        assert!(state.teardown());
        assert!(!state.teardown());
        assert!(!state.start_streaming());
        assert_eq!(state.phase, SessionPhase::Teardown);
    }
}
