//! Protocol constants

/// Frame start marker (`0x55 0x55 0x55 0xAA`)
pub const FRAME_MAGIC: [u8; 4] = [0x55, 0x55, 0x55, 0xAA];

/// Magic + dest + src + message id + message type + body length
pub const HEADER_SIZE: usize = 10;

/// Trailing checksum size
pub const CRC_SIZE: usize = 2;

/// Smallest buffer that can carry a checksum at all
pub const MIN_FRAME_SIZE: usize = 6;

/// Offset of the first record in a sub-command frame
pub const SUBCOMMAND_PREAMBLE: usize = 18;

/// Largest body length accepted from the wire
pub const MAX_BODY_SIZE: usize = 4096;

/// Default controller port
pub const DEFAULT_PORT: u16 = 7030;

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5;

/// Default time to wait for a command reply (seconds)
pub const DEFAULT_COMMAND_TIMEOUT: u64 = 10;

/// Delay between a connection fault and the next connect attempt (seconds)
pub const DEFAULT_RECONNECT_DELAY: u64 = 5;

/// Read chunk size used by the transport
pub const READ_BUFFER_SIZE: usize = 1024;

/// Sensor address carrying the ambient temperature
pub const AMBIENT_SENSOR_ADDRESS: u8 = 159;

/// Size of a group status record
pub const GROUP_RECORD_SIZE: usize = 8;

/// Group control record values
pub mod group_control {
    /// Record flag: the following byte is a position
    pub const SET_POSITION: u8 = 0x80;

    /// Record flag: close the damper
    pub const CLOSE: u8 = 2;

    /// Record flag: open the damper
    pub const OPEN: u8 = 3;
}
