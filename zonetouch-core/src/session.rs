//! Session management for the ZoneTouch 3 protocol
//!
//! A session tracks:
//! - Message id counter (one byte, shared by every outbound command)
//! - Connection lifecycle state

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No socket
    Disconnected,

    /// Connect (or reconnect) in progress
    Connecting,

    /// Socket open, listener not running
    Connected,

    /// Listener task owns the socket
    Listening,
}

impl SessionState {
    /// Whether moving to `to` is a legal step
    pub fn can_transition(self, to: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, to),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Listening)
                | (Connecting, Disconnected)
                | (Connected, Listening)
                | (Connected, Disconnected)
                | (Listening, Connecting)
                | (Listening, Connected)
                | (Listening, Disconnected)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Listening => "listening",
        };
        f.write_str(name)
    }
}

/// Message id generator
///
/// Ids start at 1 and wrap from 255 back to 1; 0 is never issued.
#[derive(Debug)]
pub struct MessageIdCounter {
    last: AtomicU8,
}

impl MessageIdCounter {
    pub fn new() -> Self {
        Self {
            last: AtomicU8::new(0),
        }
    }

    /// Take the next id
    pub fn next(&self) -> u8 {
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(Self::successor(last))
            })
            .unwrap_or_default();
        Self::successor(previous)
    }

    fn successor(last: u8) -> u8 {
        match last {
            u8::MAX => 1,
            n => n + 1,
        }
    }
}

impl Default for MessageIdCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Session manager
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    message_ids: MessageIdCounter,

    state: parking_lot::RwLock<SessionState>,
}

impl Session {
    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                message_ids: MessageIdCounter::new(),
                state: parking_lot::RwLock::new(SessionState::Disconnected),
            }),
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Check if a socket is open
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state(),
            SessionState::Connected | SessionState::Listening
        )
    }

    pub fn is_listening(&self) -> bool {
        self.state() == SessionState::Listening
    }

    /// Move to `to`, returning the previous state
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSessionState`] if the step isn't allowed from the
    /// current state; the state is left unchanged.
    pub fn transition(&self, to: SessionState) -> Result<SessionState> {
        let mut state = self.inner.state.write();
        let from = *state;

        if !from.can_transition(to) {
            return Err(Error::InvalidSessionState(format!(
                "Cannot move from {} to {}",
                from, to
            )));
        }

        *state = to;
        Ok(from)
    }

    /// Close session
    pub fn close(&self) {
        *self.inner.state.write() = SessionState::Disconnected;
    }

    /// Get next message id
    pub fn next_message_id(&self) -> u8 {
        self.inner.message_ids.next()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
