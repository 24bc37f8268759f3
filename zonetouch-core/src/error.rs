//! Error types for zonetouch-core



/// Result type alias for zonetouch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame is too short to be valid
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Unknown message type byte
    #[error("Unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// Payload ended before a field could be read
    #[error("Truncated {context}: needed {needed} bytes, {available} available")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// Expand frame carries extended data we can't parse as a full state
    #[error("Unexpected extended data code: 0x{0:04X}")]
    UnexpectedExtendedData(u16),

    /// Zone id outside the 6-bit range
    #[error("Invalid zone id: {0} (max: 63)")]
    InvalidZone(u8),

    /// Damper position outside 0-100
    #[error("Invalid position: {0} (max: 100)")]
    InvalidPosition(u8),

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),
}

impl Error {
    /// Check if the frame can simply be dropped and the stream continued
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. }
                | Self::UnknownMessageType(_)
                | Self::UnexpectedExtendedData(_)
        )
    }

    /// Check if error requires reconnection
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, Self::InvalidSessionState(_))
    }
}
