//! ZoneTouch 3 protocol codes

use std::fmt;

use crate::error::{Error, Result};

/// Bus addresses of the controller components
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Address {
    MainBoard = 0x80,
    Console = 0x90,
    /// Used as the source of every frame this client sends
    Remote = 0xB0,
}

impl From<Address> for u8 {
    fn from(addr: Address) -> u8 {
        addr as u8
    }
}

/// Message type byte of the frame header
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Extended data (full state and friends)
    Expand = 0x1F,
    SubCommand = 0xC0,
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x1F => Ok(Self::Expand),
            0xC0 => Ok(Self::SubCommand),
            _ => Err(Error::UnknownMessageType(value)),
        }
    }
}

/// Sub-type of an inbound `SubCommand` frame
///
/// Only group control, group name, sensor and spill carry data the client
/// uses; the rest are recognized so they can be logged by name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Response {
    GroupControl = 0x21,
    Sensor = 0x2B,
    Notification = 0x2D,
    Favourite = 0x31,
    Program = 0x35,
    GroupName = 0x43,
    Preference = 0x45,
    Password = 0x47,
    Parameters = 0x51,
    ZoneInfo = 0x53,
    Grouping = 0x55,
    Spill = 0x57,
    Service = 0x59,
}

impl Response {
    pub fn name(self) -> &'static str {
        match self {
            Self::GroupControl => "RESPONSE_GROUP_CONTROL",
            Self::Sensor => "RESPONSE_SENSOR",
            Self::Notification => "RESPONSE_NOTIFICATION",
            Self::Favourite => "RESPONSE_FAVOURITE",
            Self::Program => "RESPONSE_PROGRAM",
            Self::GroupName => "RESPONSE_GROUP_NAME",
            Self::Preference => "RESPONSE_PREFERENCE",
            Self::Password => "RESPONSE_PASSWORD",
            Self::Parameters => "RESPONSE_PARAMETERS",
            Self::ZoneInfo => "RESPONSE_ZONE_INFO",
            Self::Grouping => "RESPONSE_GROUPING",
            Self::Spill => "RESPONSE_SPILL",
            Self::Service => "RESPONSE_SERVICE",
        }
    }

    /// Decode a sub-type byte, `None` for codes the protocol doesn't define
    pub fn from_code(value: u8) -> Option<Self> {
        match value {
            0x21 => Some(Self::GroupControl),
            0x2B => Some(Self::Sensor),
            0x2D => Some(Self::Notification),
            0x31 => Some(Self::Favourite),
            0x35 => Some(Self::Program),
            0x43 => Some(Self::GroupName),
            0x45 => Some(Self::Preference),
            0x47 => Some(Self::Password),
            0x51 => Some(Self::Parameters),
            0x53 => Some(Self::ZoneInfo),
            0x55 => Some(Self::Grouping),
            0x57 => Some(Self::Spill),
            0x59 => Some(Self::Service),
            _ => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Outbound command codes
///
/// Sub-commands are encoded as two bytes: the high byte is the
/// `SubCommand` message type and the low byte follows the body length.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    Expand = 0x001F,
    GroupControl = 0xC020,
    GroupStatus = 0xC021,
    GroupName = 0xC042,
    Spill = 0xC057,
}

impl Command {
    pub fn message_type(self) -> MessageType {
        match self {
            Self::Expand => MessageType::Expand,
            _ => MessageType::SubCommand,
        }
    }

    /// Low byte written after the body length, for sub-commands
    pub fn sub_code(self) -> Option<u8> {
        match self.message_type() {
            MessageType::SubCommand => Some((self as u16 & 0xFF) as u8),
            MessageType::Expand => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Expand => "COMMAND_EXPAND",
            Self::GroupControl => "COMMAND_GROUP_CONTROL",
            Self::GroupStatus => "COMMAND_GROUP_STATUS",
            Self::GroupName => "COMMAND_GROUP_NAME",
            Self::Spill => "COMMAND_SPILL",
        }
    }
}

impl From<Command> for u16 {
    fn from(cmd: Command) -> u16 {
        cmd as u16
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name(), *self as u16)
    }
}

/// Extended-data codes carried by `Expand` frames
pub mod extended_data {
    pub const FULL_STATE: u16 = 0xFFF0;
    pub const OWNER_NAME: u16 = 0xFF3A;
}
