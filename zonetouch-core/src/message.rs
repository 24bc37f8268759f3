//! Inbound message decoding
//!
//! Every frame received from the controller is decoded into a [`Message`]:
//! the checksum is verified, the header parsed and the body dispatched on
//! message type and sub-type into a typed [`Payload`].

use bytes::Bytes;
use tracing::{debug, trace};
use zonetouch_types::{DeviceState, GroupStatus, SpillMask};

use crate::{
    checksum,
    command::{extended_data, MessageType, Response},
    constants::{
        AMBIENT_SENSOR_ADDRESS, CRC_SIZE, GROUP_RECORD_SIZE, HEADER_SIZE, MIN_FRAME_SIZE,
        SUBCOMMAND_PREAMBLE,
    },
    error::{Error, Result},
    frame::FrameHeader,
    fullstate,
    group::{decode_status, decode_text},
};

/// Typed content of an inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Complete snapshot (`Expand` with the full-state code)
    FullState(Box<DeviceState>),

    /// Any other extended data, kept raw
    Expand { code: u16, data: Bytes },

    /// Ambient temperature, if the ambient sensor was among the records
    Sensor(Option<f32>),

    GroupControl(Vec<GroupStatus>),

    GroupNames(Vec<(u8, String)>),

    Spill(SpillMask),

    /// Recognized sub-type the client doesn't process
    Ignored(Response),

    /// Sub-type code the protocol doesn't define
    Unknown(u8),
}

/// Decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: FrameHeader,

    pub kind: MessageType,

    /// Sub-type byte of `SubCommand` frames
    pub sub_type: Option<u8>,

    pub payload: Payload,
}

impl Message {
    /// Decode one complete frame
    ///
    /// # Errors
    ///
    /// - [`Error::FrameTooShort`] below the minimum frame size
    /// - [`Error::ChecksumMismatch`] when the trailing checksum is wrong
    /// - [`Error::UnknownMessageType`] for header types other than
    ///   `Expand`/`SubCommand`
    /// - [`Error::Truncated`] when records run past the end of the frame
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() < MIN_FRAME_SIZE {
            return Err(Error::FrameTooShort {
                expected: MIN_FRAME_SIZE,
                actual: frame.len(),
            });
        }

        if !checksum::verify(frame) {
            let (expected, received) = checksum::compare(frame).unwrap_or_default();
            return Err(Error::ChecksumMismatch { expected, received });
        }

        if frame.len() < HEADER_SIZE + CRC_SIZE {
            return Err(Error::FrameTooShort {
                expected: HEADER_SIZE + CRC_SIZE,
                actual: frame.len(),
            });
        }

        let header = FrameHeader::parse(frame)?;
        let kind = header.kind()?;

        trace!(
            message_id = header.message_id,
            kind = ?kind,
            frame = %hex::encode(frame),
            "Decoding frame"
        );

        let (sub_type, payload) = match kind {
            MessageType::Expand => {
                let body = &frame[HEADER_SIZE..frame.len() - CRC_SIZE];
                (None, decode_expand(body)?)
            }
            MessageType::SubCommand => {
                let sub_type = frame[HEADER_SIZE];
                (Some(sub_type), decode_subcommand(frame, sub_type)?)
            }
        };

        Ok(Self {
            header,
            kind,
            sub_type,
            payload,
        })
    }

    pub fn message_id(&self) -> u8 {
        self.header.message_id
    }

    /// Recognized sub-type, if any
    pub fn response(&self) -> Option<Response> {
        self.sub_type.and_then(Response::from_code)
    }
}

fn decode_expand(body: &[u8]) -> Result<Payload> {
    if body.len() < 2 {
        return Err(Error::Truncated {
            context: "extended data code",
            needed: 2,
            available: body.len(),
        });
    }

    let code = u16::from_be_bytes([body[0], body[1]]);
    if code == extended_data::FULL_STATE {
        let state = fullstate::parse(body)?;
        return Ok(Payload::FullState(Box::new(state)));
    }

    debug!("Extended data 0x{:04X} not processed", code);
    Ok(Payload::Expand {
        code,
        data: Bytes::copy_from_slice(&body[2..]),
    })
}

fn decode_subcommand(frame: &[u8], sub_type: u8) -> Result<Payload> {
    let end = frame.len() - CRC_SIZE;
    if end < SUBCOMMAND_PREAMBLE {
        return Err(Error::Truncated {
            context: "sub-command preamble",
            needed: SUBCOMMAND_PREAMBLE + CRC_SIZE,
            available: frame.len(),
        });
    }

    // sub-type(1) pad(1) reserved(2) record length(2) record count(2)
    let length = u16::from_be_bytes([frame[14], frame[15]]) as usize;
    let count = u16::from_be_bytes([frame[16], frame[17]]) as usize;
    let records = &frame[SUBCOMMAND_PREAMBLE..end];

    let Some(response) = Response::from_code(sub_type) else {
        debug!("RESPONSE_UNKNOWN(0x{:02X})", sub_type);
        return Ok(Payload::Unknown(sub_type));
    };

    debug!(count, length, "{}", response.name());

    match response {
        Response::GroupControl => decode_group_control(records, count).map(Payload::GroupControl),
        Response::GroupName => decode_group_names(records, count, length).map(Payload::GroupNames),
        Response::Sensor => decode_sensor(records, count, length).map(Payload::Sensor),
        Response::Spill => decode_spill(records).map(Payload::Spill),
        other => Ok(Payload::Ignored(other)),
    }
}

fn decode_group_control(records: &[u8], count: usize) -> Result<Vec<GroupStatus>> {
    (0..count)
        .map(|idx| {
            let start = GROUP_RECORD_SIZE * idx;
            let record = records.get(start..).unwrap_or_default();
            decode_status(record)
        })
        .collect()
}

/// Names: the first payload byte is the name width, then each record at
/// `length * idx + 2` is `zone id || name`.
fn decode_group_names(records: &[u8], count: usize, length: usize) -> Result<Vec<(u8, String)>> {
    let name_len = *records.first().ok_or(Error::Truncated {
        context: "group name width",
        needed: 1,
        available: 0,
    })? as usize;

    (0..count)
        .map(|idx| {
            let start = length * idx + 2;
            let end = start + 1 + name_len;
            let record = records.get(start..end).ok_or(Error::Truncated {
                context: "group name record",
                needed: end,
                available: records.len(),
            })?;
            Ok((record[0], decode_text(&record[1..])))
        })
        .collect()
}

/// Sensor records are `addr, reserved, raw(i16)`; only the ambient sensor
/// is meaningful.
fn decode_sensor(records: &[u8], count: usize, length: usize) -> Result<Option<f32>> {
    let mut temperature = None;

    for idx in 0..count {
        let start = length * idx;
        let record = records.get(start..start + 4).ok_or(Error::Truncated {
            context: "sensor record",
            needed: start + 4,
            available: records.len(),
        })?;

        if record[0] == AMBIENT_SENSOR_ADDRESS {
            let raw = i16::from_be_bytes([record[2], record[3]]);
            temperature = Some(fullstate::temperature_from_raw(raw));
        }
    }

    Ok(temperature)
}

/// Spill mask: bytes 2..6 of the payload, little-endian, zone 0 in the
/// lowest bit of byte 2. Missing trailing bytes read as zero.
fn decode_spill(records: &[u8]) -> Result<SpillMask> {
    if records.len() < 3 {
        return Err(Error::Truncated {
            context: "spill mask",
            needed: 3,
            available: records.len(),
        });
    }

    let mut bytes = [0u8; 4];
    for (dst, src) in bytes.iter_mut().zip(&records[2..]) {
        *dst = *src;
    }

    Ok(SpillMask(u32::from_le_bytes(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Address;
    use crate::frame::{encode_frame, Frame};
    use pretty_assertions::assert_eq;
    use zonetouch_types::PowerStatus;

    /// Build a sub-command push from the main board
    fn subcommand(message_id: u8, sub_type: u8, length: u16, count: u16, records: &[u8]) -> Vec<u8> {
        let mut body = vec![sub_type, 0x00, 0x00, 0x00];
        body.extend_from_slice(&length.to_be_bytes());
        body.extend_from_slice(&count.to_be_bytes());
        body.extend_from_slice(records);
        encode_frame(
            Address::MainBoard.into(),
            Address::Remote.into(),
            message_id,
            MessageType::SubCommand.into(),
            &body,
        )
        .to_vec()
    }

    #[test]
    fn test_decode_sensor_temperature() {
        let frame = subcommand(3, 0x2B, 4, 1, &[159, 0, 0x02, 0x26]); // 550
        let message = Message::decode(&frame).unwrap();

        assert_eq!(message.response(), Some(Response::Sensor));
        assert_eq!(message.payload, Payload::Sensor(Some(5.0)));
    }

    #[test]
    fn test_decode_sensor_zero_point() {
        let frame = subcommand(3, 0x2B, 4, 1, &[159, 0, 0x01, 0xF4]); // 500
        let message = Message::decode(&frame).unwrap();
        assert_eq!(message.payload, Payload::Sensor(Some(0.0)));
    }

    #[test]
    fn test_decode_sensor_ignores_other_addresses() {
        let frame = subcommand(3, 0x2B, 4, 2, &[10, 0, 0x02, 0x26, 159, 0, 0x02, 0x30]);
        let message = Message::decode(&frame).unwrap();
        assert_eq!(message.payload, Payload::Sensor(Some(6.0)));

        let frame = subcommand(3, 0x2B, 4, 1, &[10, 0, 0x02, 0x26]);
        let message = Message::decode(&frame).unwrap();
        assert_eq!(message.payload, Payload::Sensor(None));
    }

    #[test]
    fn test_decode_group_control() {
        let records = [
            0x40, 50, 0, 0, 0, 0, 0x80, 0, // zone 0 ON 50%, turbo capable
            0x01, 0, 0, 0, 0, 0, 0x02, 0, // zone 1 OFF 0%, spilling
        ];
        let frame = subcommand(12, 0x21, 8, 2, &records);
        let message = Message::decode(&frame).unwrap();

        assert_eq!(message.message_id(), 12);
        let Payload::GroupControl(groups) = message.payload else {
            panic!("Expected group control payload");
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, 0);
        assert_eq!(groups[0].position, 50);
        assert_eq!(groups[0].power_status, PowerStatus::On);
        assert!(groups[0].supports_turbo);
        assert_eq!(groups[1].id, 1);
        assert_eq!(groups[1].power_status, PowerStatus::Off);
        assert!(groups[1].spill_on);
    }

    #[test]
    fn test_decode_group_control_truncated() {
        let frame = subcommand(1, 0x21, 8, 2, &[0x40, 50, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            Message::decode(&frame),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_group_names() {
        // name width 8, record stride 10
        let mut records = vec![8, 0];
        records.extend_from_slice(&[0]);
        records.extend_from_slice(b"Living\0\0");
        records.extend_from_slice(&[0]);
        records.extend_from_slice(&[1]);
        records.extend_from_slice(b"Kitchen\0");

        let frame = subcommand(4, 0x43, 10, 2, &records);
        let message = Message::decode(&frame).unwrap();

        assert_eq!(
            message.payload,
            Payload::GroupNames(vec![(0, "Living".into()), (1, "Kitchen".into())])
        );
    }

    #[test]
    fn test_decode_spill_mask() {
        let frame = subcommand(5, 0x57, 8, 1, &[0, 0, 0b0000_0101, 0x01, 0, 0, 0, 0]);
        let message = Message::decode(&frame).unwrap();

        let Payload::Spill(mask) = message.payload else {
            panic!("Expected spill payload");
        };
        assert_eq!(mask.zones().collect::<Vec<_>>(), vec![0, 2, 8]);
    }

    #[test]
    fn test_decode_recognized_but_ignored() {
        let frame = subcommand(6, 0x59, 0, 0, &[]);
        let message = Message::decode(&frame).unwrap();
        assert_eq!(message.payload, Payload::Ignored(Response::Service));
    }

    #[test]
    fn test_decode_unknown_sub_type() {
        let frame = subcommand(6, 0x7E, 0, 0, &[]);
        let message = Message::decode(&frame).unwrap();
        assert_eq!(message.payload, Payload::Unknown(0x7E));
        assert_eq!(message.response(), None);
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut frame = subcommand(1, 0x2B, 4, 1, &[159, 0, 0x02, 0x26]);
        frame[19] ^= 0x01;

        assert!(matches!(
            Message::decode(&frame),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            Message::decode(&[0x55, 0x55, 0x55]),
            Err(Error::FrameTooShort { expected: 6, actual: 3 })
        ));
    }

    #[test]
    fn test_decode_unknown_message_type() {
        let frame = encode_frame(0x80, 0xB0, 1, 0x33, &[0, 0]);
        assert!(matches!(
            Message::decode(&frame),
            Err(Error::UnknownMessageType(0x33))
        ));
    }

    #[test]
    fn test_decode_own_set_position_frame() {
        let encoded = Frame::group_position(1, 3, 75).unwrap().encode();
        let message = Message::decode(&encoded).unwrap();

        assert_eq!(message.kind, MessageType::SubCommand);
        assert_eq!(message.sub_type, Some(0x20));
        assert_eq!(message.payload, Payload::Unknown(0x20));
        assert_eq!(encoded[SUBCOMMAND_PREAMBLE], 3);
        assert_eq!(encoded[SUBCOMMAND_PREAMBLE + 2], 75);
    }

    #[test]
    fn test_decode_other_extended_data() {
        let mut body = extended_data::OWNER_NAME.to_be_bytes().to_vec();
        body.extend_from_slice(b"Smith");
        let frame = encode_frame(0x90, 0xB0, 2, 0x1F, &body);
        let message = Message::decode(&frame).unwrap();

        assert_eq!(
            message.payload,
            Payload::Expand {
                code: extended_data::OWNER_NAME,
                data: Bytes::from_static(b"Smith"),
            }
        );
    }
}
