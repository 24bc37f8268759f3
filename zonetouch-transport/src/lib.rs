//! Transport layer for the ZoneTouch 3 protocol
//!
//! Provides the TCP connection to a controller and the stream framing that
//! turns its byte stream back into frames.

pub mod codec;
pub mod error;
pub mod tcp;

pub use codec::FrameCodec;
pub use error::{Error, Result};
pub use tcp::TcpTransport;

use async_trait::async_trait;
use bytes::Bytes;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to device
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from device
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send one encoded frame
    async fn send(&mut self, data: Bytes) -> Result<()>;

    /// Receive the next complete frame
    ///
    /// Cancel safe: dropping the future loses no buffered bytes.
    async fn receive(&mut self) -> Result<Bytes>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
