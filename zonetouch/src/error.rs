//! High-level error types

use zonetouch_core::SessionState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] zonetouch_transport::Error),

    #[error("Core protocol error: {0}")]
    Core(#[from] zonetouch_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] zonetouch_transport::Error),

    #[error("Controller not connected ({0})")]
    NotConnected(SessionState),

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Listener already running")]
    AlreadyListening,

    #[error("No reply to message {message_id}")]
    Timeout { message_id: u8 },

    #[error("Connection lost before a reply arrived")]
    ConnectionLost,

    #[error("Invalid response from controller: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Check if the same request may succeed if simply retried
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionLost => true,
            Self::Core(e) => e.is_recoverable(),
            _ => false,
        }
    }

    /// Check if the client has to be reconnected before it is usable again
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::NotConnected(_) => true,
            Self::Transport(e) => e.is_connection_lost(),
            Self::Core(e) => e.requires_reconnect(),
            _ => false,
        }
    }
}
