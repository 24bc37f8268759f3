//! # zonetouch-core
//!
//! Core protocol implementation for ZoneTouch 3 zone controllers.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding
//! - Inbound message decoding and dispatch
//! - Modbus CRC-16 checksum
//! - Full-state parsing and incremental state merge
//! - Message id and session lifecycle tracking

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod fullstate;
pub mod group;
pub mod message;
pub mod session;
pub mod state;

pub use command::{Address, Command, MessageType, Response};
pub use constants::DEFAULT_PORT;
pub use error::{Error, Result};
pub use frame::{Frame, FrameHeader};
pub use message::{Message, Payload};
pub use session::{Session, SessionState};
pub use state::Merge;
