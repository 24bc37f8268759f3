//! Modbus CRC-16
//!
//! Every frame is signed with the modbus flavour of CRC-16, computed over
//! the frame body (header magic and checksum excluded):
//! 1. Start with register 0xFFFF
//! 2. XOR each byte into the low end of the register
//! 3. Shift right eight times, XOR with 0xA001 whenever a 1 falls out
//!
//! The algorithm yields the result as `(high, low)`. On the wire the two
//! bytes are appended swapped, low byte first.

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::constants::{CRC_SIZE, FRAME_MAGIC, MIN_FRAME_SIZE};

const POLYNOMIAL: u16 = 0xA001;

/// Calculate the CRC register for `data`
pub fn crc16_word(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

/// Calculate the checksum of `data` as `(high, low)`
///
/// # Examples
///
/// ```
/// use zonetouch_core::checksum;
///
/// let (high, low) = checksum::crc16(b"123456789");
/// assert_eq!((high, low), (0x4B, 0x37));
/// ```
pub fn crc16(data: &[u8]) -> (u8, u8) {
    let crc = crc16_word(data);
    let high = (crc >> 8) as u8;
    let low = (crc & 0xFF) as u8;

    trace!(
        len = data.len(),
        checksum = format!("0x{:04X}", crc),
        "Calculated checksum"
    );

    (high, low)
}

/// Trailing bytes for a frame body, in wire order
pub fn trailer(body: &[u8]) -> [u8; CRC_SIZE] {
    let (high, low) = crc16(body);
    [low, high]
}

/// Sign a frame under construction
///
/// `frame` holds the magic followed by the body; the checksum of the body
/// is appended in wire order.
pub fn append(frame: &mut BytesMut) {
    let start = FRAME_MAGIC.len().min(frame.len());
    let trailer = trailer(&frame[start..]);
    frame.put_slice(&trailer);
}

/// Verify the checksum of a complete frame
///
/// The checksum covers `frame[4..len - 2]` and is compared against the
/// trailing two bytes using the swapped order.
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < MIN_FRAME_SIZE {
        return false;
    }

    let split = frame.len() - CRC_SIZE;
    let (high, low) = crc16(&frame[4..split]);

    frame[split] == low && frame[split + 1] == high
}

/// Checksum of a frame as `(expected, received)` words, for reporting
pub fn compare(frame: &[u8]) -> Option<(u16, u16)> {
    if frame.len() < MIN_FRAME_SIZE {
        return None;
    }

    let split = frame.len() - CRC_SIZE;
    let expected = crc16_word(&frame[4..split]);
    let received = u16::from_le_bytes([frame[split], frame[split + 1]]);
    Some((expected, received))
}
