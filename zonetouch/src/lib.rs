//! # zonetouch
//!
//! Async client for Polyaire ZoneTouch 3 HVAC zone controllers.
//!
//! ## Features
//!
//! - Binary protocol over TCP with checksum validation
//! - Background listener merging pushed updates into a shared state
//! - Request/response correlation by message id through a single writer
//! - Automatic reconnect
//!
//! ## Quick Start
//!
//! ```no_run
//! use zonetouch::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> zonetouch::Result<()> {
//!     let client = Client::with_handler(
//!         ClientConfig::new("192.168.1.50"),
//!         |state: &zonetouch::DeviceState| println!("{}", state),
//!     );
//!
//!     client.connect().await?;
//!     client.start_listener().await?;
//!     client.fetch_full_state().await?;
//!
//!     // Close the kitchen
//!     client.set_closed(1, true).await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
mod listener;
pub mod pending;

// Re-exports
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use handler::{NoopHandler, StateHandler};
pub use pending::Reply;

// Re-export types
pub use zonetouch_core::{Frame, Message, Payload, SessionState};
pub use zonetouch_types::{DeviceState, PowerStatus, ServiceDueStatus, Zone};
