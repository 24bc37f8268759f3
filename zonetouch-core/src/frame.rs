//! ZoneTouch 3 frame structure and encoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::{extended_data, Address, Command, MessageType},
    constants::{group_control, CRC_SIZE, FRAME_MAGIC, HEADER_SIZE},
    error::{Error, Result},
};

/// Frame header
///
/// # Frame Structure
///
/// ```text
/// ┌──────────┬──────┬─────┬────────┬──────────┬──────────┬────────┬────────┐
/// │  Magic   │ Dest │ Src │ Msg ID │ Msg Type │ Body Len │  Body  │  CRC   │
/// │ 4 bytes  │  1   │  1  │   1    │    1     │ 2 (BE)   │ N      │ 2 (LE) │
/// └──────────┴──────┴─────┴────────┴──────────┴──────────┴────────┴────────┘
/// ```
///
/// The checksum covers everything between the magic and the checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Start marker (reserved, not validated on decode)
    pub magic: [u8; 4],

    pub destination: u8,

    pub source: u8,

    pub message_id: u8,

    /// Raw message type byte
    pub message_type: u8,

    /// Bytes between the header and the checksum
    pub body_length: u16,
}

impl FrameHeader {
    /// Parse the first [`HEADER_SIZE`] bytes of `buf`
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::FrameTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let mut buf = &buf[..HEADER_SIZE];
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);

        Ok(Self {
            magic,
            destination: buf.get_u8(),
            source: buf.get_u8(),
            message_id: buf.get_u8(),
            message_type: buf.get_u8(),
            body_length: buf.get_u16(),
        })
    }

    /// Total size of the frame this header announces
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.body_length as usize + CRC_SIZE
    }

    pub fn kind(&self) -> Result<MessageType> {
        MessageType::try_from(self.message_type)
    }
}

/// Encode a frame from raw header fields and body
///
/// Writes the magic, the header, `body` and the swapped checksum. The
/// body length field is derived from `body`.
pub fn encode_frame(
    destination: u8,
    source: u8,
    message_id: u8,
    message_type: u8,
    body: &[u8],
) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len() + CRC_SIZE);

    buf.put_slice(&FRAME_MAGIC);
    buf.put_u8(destination);
    buf.put_u8(source);
    buf.put_u8(message_id);
    buf.put_u8(message_type);
    buf.put_u16(body.len() as u16);
    buf.put_slice(body);

    checksum::append(&mut buf);

    buf
}

/// Read the message id of an encoded frame without decoding it
pub fn peek_message_id(frame: &[u8]) -> Option<u8> {
    if frame.len() < HEADER_SIZE {
        return None;
    }
    Some(frame[6])
}

/// Outbound command frame
///
/// # Examples
///
/// ```
/// use zonetouch_core::Frame;
///
/// let frame = Frame::group_position(1, 3, 75).unwrap();
/// let encoded = frame.encode();
/// assert_eq!(encoded[10], 0x20);
/// assert_eq!(encoded[18], 3);
/// assert_eq!(encoded[20], 75);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub destination: Address,

    /// Always [`Address::Remote`] for frames built here
    pub source: Address,

    pub message_id: u8,

    pub command: Command,

    /// Command data following the sub-code (or the length, for `Expand`)
    pub data: Bytes,
}

impl Frame {
    pub fn new(
        destination: Address,
        message_id: u8,
        command: Command,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            destination,
            source: Address::Remote,
            message_id,
            command,
            data: data.into(),
        }
    }

    /// Request the complete device snapshot from the console
    pub fn full_state(message_id: u8) -> Self {
        Self::new(
            Address::Console,
            message_id,
            Command::Expand,
            extended_data::FULL_STATE.to_be_bytes().to_vec(),
        )
    }

    /// Drive a zone to `position` percent
    pub fn group_position(message_id: u8, zone_id: u8, position: u8) -> Result<Self> {
        if position > 100 {
            return Err(Error::InvalidPosition(position));
        }
        Self::group_control(message_id, zone_id, group_control::SET_POSITION, position)
    }

    /// Close (or re-open) a zone without changing its stored position
    pub fn group_closed(message_id: u8, zone_id: u8, closed: bool) -> Result<Self> {
        let action = if closed {
            group_control::CLOSE
        } else {
            group_control::OPEN
        };
        Self::group_control(message_id, zone_id, action, 0)
    }

    /// Ask the main board which zones are spill-eligible
    pub fn spill(message_id: u8) -> Self {
        Self::new(Address::MainBoard, message_id, Command::Spill, vec![0u8; 7])
    }

    fn group_control(message_id: u8, zone_id: u8, action: u8, value: u8) -> Result<Self> {
        if zone_id > zonetouch_types::zone::MAX_ZONE_ID {
            return Err(Error::InvalidZone(zone_id));
        }

        // reserved(1) reserved(2) record length(2) record count(2) record(4)
        let mut data = BytesMut::with_capacity(11);
        data.put_u8(0);
        data.put_u16(0);
        data.put_u16(4);
        data.put_u16(1);
        data.put_slice(&[zone_id, action, value, 0]);

        Ok(Self::new(
            Address::MainBoard,
            message_id,
            Command::GroupControl,
            data.freeze(),
        ))
    }

    /// Everything between the header and the checksum
    pub fn body(&self) -> BytesMut {
        let mut body = BytesMut::with_capacity(1 + self.data.len());
        if let Some(code) = self.command.sub_code() {
            body.put_u8(code);
        }
        body.put_slice(&self.data);
        body
    }

    /// Encode frame to bytes
    pub fn encode(&self) -> Bytes {
        encode_frame(
            self.destination.into(),
            self.source.into(),
            self.message_id,
            self.command.message_type().into(),
            &self.body(),
        )
        .freeze()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("destination", &self.destination)
            .field("source", &self.source)
            .field("message_id", &self.message_id)
            .field("command", &self.command)
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame[{}](id={}, dest={:?}, len={})",
            self.command,
            self.message_id,
            self.destination,
            self.data.len()
        )
    }
}
