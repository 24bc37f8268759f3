//! Full-state payload parser
//!
//! The controller answers a full-state request with an `Expand` frame whose
//! body describes the whole system:
//!
//! ```text
//! code(2) device id(8) owner(16) options(1) service due(1) password(8)
//! installer(10) telephone(12) temperature(i16)
//! len+hardware len+firmware len+boot len+console len+console id
//! group count(1) stride(1) name width(1) reserved(1)
//! stride * [status(1) position(1) reserved(4) flags(1) reserved(1) ... name]
//! ```
//!
//! Group records start 4 bytes into each stride, names 14 bytes in.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use tracing::debug;
use zonetouch_types::{DeviceState, ServiceDueStatus, Zone};

use crate::{
    command::extended_data,
    constants::GROUP_RECORD_SIZE,
    error::{Error, Result},
    group::{decode_status, decode_text},
};

/// Offset of the status record within a group stride
const GROUP_RECORD_OFFSET: usize = 4;

/// Offset of the name within a group stride
const GROUP_NAME_OFFSET: usize = 14;

/// Convert a raw sensor reading to degrees Celsius
pub fn temperature_from_raw(raw: i16) -> f32 {
    (raw as f32 - 500.0) / 10.0
}

/// Parse a full-state payload (starting at the extended-data code)
///
/// # Errors
///
/// [`Error::UnexpectedExtendedData`] if the code isn't the full-state code,
/// [`Error::Truncated`] if the payload ends early.
pub fn parse(payload: &[u8]) -> Result<DeviceState> {
    let mut reader = Reader::new(payload);

    let code = reader.u16("extended data code")?;
    if code != extended_data::FULL_STATE {
        return Err(Error::UnexpectedExtendedData(code));
    }

    let mut state = DeviceState {
        device_id: reader.text(8, "device id")?,
        owner: reader.text(16, "owner")?,
        options: reader.u8("options")?,
        service_due: ServiceDueStatus::from(reader.u8("service due")?),
        password: reader.text(8, "password")?,
        installer: reader.text(10, "installer")?,
        telephone: reader.text(12, "telephone")?,
        temperature: temperature_from_raw(reader.i16("temperature")?),
        hardware_version: reader.prefixed("hardware version")?,
        firmware_version: reader.prefixed("firmware version")?,
        boot_version: reader.prefixed("boot version")?,
        console_version: reader.prefixed("console version")?,
        console_id: reader.prefixed("console id")?,
        ..DeviceState::default()
    };

    let groups = reader.remaining();
    for zone in parse_groups(groups)? {
        state.insert_zone(zone);
    }

    debug!(
        device_id = %state.device_id,
        zones = state.zones.len(),
        "Parsed full state"
    );

    Ok(state)
}

fn parse_groups(data: &[u8]) -> Result<Vec<Zone>> {
    if data.len() < 3 {
        return Err(Error::Truncated {
            context: "group section",
            needed: 3,
            available: data.len(),
        });
    }

    let count = data[0] as usize;
    let stride = data[1] as usize;
    let name_len = data[2] as usize;

    (0..count)
        .map(|idx| {
            let start = stride * idx + GROUP_RECORD_OFFSET;
            let record = slice(data, start, GROUP_RECORD_SIZE, "group record")?;
            let status = decode_status(record)?;

            let start = stride * idx + GROUP_NAME_OFFSET;
            let name = decode_text(slice(data, start, name_len, "group name")?);

            Ok(Zone::from_status(status, name))
        })
        .collect()
}

fn slice<'a>(data: &'a [u8], start: usize, len: usize, context: &'static str) -> Result<&'a [u8]> {
    data.get(start..start + len).ok_or(Error::Truncated {
        context,
        needed: start + len,
        available: data.len(),
    })
}

/// Sequential reader mapping short reads to [`Error::Truncated`]
struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    fn truncated(&self, start: u64, context: &'static str, len: usize) -> Error {
        Error::Truncated {
            context,
            needed: start as usize + len,
            available: self.cursor.get_ref().len(),
        }
    }

    fn u8(&mut self, context: &'static str) -> Result<u8> {
        let start = self.cursor.position();
        self.cursor
            .read_u8()
            .map_err(|_| self.truncated(start, context, 1))
    }

    fn u16(&mut self, context: &'static str) -> Result<u16> {
        let start = self.cursor.position();
        self.cursor
            .read_u16::<BigEndian>()
            .map_err(|_| self.truncated(start, context, 2))
    }

    fn i16(&mut self, context: &'static str) -> Result<i16> {
        let start = self.cursor.position();
        self.cursor
            .read_i16::<BigEndian>()
            .map_err(|_| self.truncated(start, context, 2))
    }

    fn text(&mut self, len: usize, context: &'static str) -> Result<String> {
        let start = self.cursor.position();
        let mut buf = vec![0u8; len];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| self.truncated(start, context, len))?;
        Ok(decode_text(&buf))
    }

    /// One length byte followed by that many bytes of text
    fn prefixed(&mut self, context: &'static str) -> Result<String> {
        let len = self.u8(context)? as usize;
        self.text(len, context)
    }

    fn remaining(&self) -> &'a [u8] {
        let data: &'a [u8] = *self.cursor.get_ref();
        let pos = (self.cursor.position() as usize).min(data.len());
        &data[pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use zonetouch_types::PowerStatus;

    fn fixed(text: &str, len: usize) -> Vec<u8> {
        let mut field = text.as_bytes().to_vec();
        field.resize(len, 0);
        field
    }

    fn prefixed(text: &str) -> Vec<u8> {
        let mut field = vec![text.len() as u8];
        field.extend_from_slice(text.as_bytes());
        field
    }

    /// Payload with the given (status, position, flags, name) groups, 16-byte stride
    fn payload(groups: &[(u8, u8, u8, &str)]) -> Vec<u8> {
        let mut data = extended_data::FULL_STATE.to_be_bytes().to_vec();
        data.extend(fixed("ZT3-0001", 8));
        data.extend(fixed("Jones", 16));
        data.push(0x05);
        data.push(1);
        data.extend(fixed("1234", 8));
        data.extend(fixed("Cool Air", 10));
        data.extend(fixed("0400000000", 12));
        data.extend(735i16.to_be_bytes());
        data.extend(prefixed("1.0"));
        data.extend(prefixed("2.1.4"));
        data.extend(prefixed("0.9"));
        data.extend(prefixed("3.2"));
        data.extend(prefixed("C0FFEE"));

        let stride = 16;
        data.extend([groups.len() as u8, stride as u8, 6, 0]);
        for (status, position, flags, name) in groups {
            let mut record = vec![0u8; stride];
            record[0] = *status;
            record[1] = *position;
            record[6] = *flags;
            record[10..16].copy_from_slice(&fixed(name, 6));
            data.extend(record);
        }
        data
    }

    #[test]
    fn test_temperature_from_raw() {
        assert_eq!(temperature_from_raw(500), 0.0);
        assert_eq!(temperature_from_raw(735), 23.5);
        assert_eq!(temperature_from_raw(400), -10.0);
    }

    #[test]
    fn test_parse_device_fields() {
        let state = parse(&payload(&[])).unwrap();

        assert_eq!(state.device_id, "ZT3-0001");
        assert_eq!(state.owner, "Jones");
        assert_eq!(state.options, 0x05);
        assert_eq!(state.service_due, ServiceDueStatus::HalfYear);
        assert_eq!(state.password, "1234");
        assert_eq!(state.installer, "Cool Air");
        assert_eq!(state.telephone, "0400000000");
        assert_eq!(state.temperature, 23.5);
        assert_eq!(state.hardware_version, "1.0");
        assert_eq!(state.firmware_version, "2.1.4");
        assert_eq!(state.boot_version, "0.9");
        assert_eq!(state.console_version, "3.2");
        assert_eq!(state.console_id, "C0FFEE");
        assert!(state.zones.is_empty());
    }

    #[test]
    fn test_parse_groups() {
        let state = parse(&payload(&[
            (0x40, 50, 0x00, "Living"),
            (0x01, 0, 0x82, "Bed"),
        ]))
        .unwrap();

        assert_eq!(state.zones.len(), 2);

        let living = state.zone(0).unwrap();
        assert_eq!(living.name, "Living");
        assert_eq!(living.position, 50);
        assert_eq!(living.power_status, PowerStatus::On);
        assert!(!living.supports_turbo);

        let bed = state.zone(1).unwrap();
        assert_eq!(bed.name, "Bed");
        assert_eq!(bed.power_status, PowerStatus::Off);
        assert!(bed.supports_turbo);
        assert!(bed.spill_on);
        assert!(!bed.spill_set);
    }

    #[test]
    fn test_parse_rejects_other_code() {
        let mut data = payload(&[]);
        data[0] = 0xFF;
        data[1] = 0x3A;

        assert!(matches!(
            parse(&data),
            Err(Error::UnexpectedExtendedData(0xFF3A))
        ));
    }

    #[test]
    fn test_parse_truncated_header() {
        let data = payload(&[]);
        assert!(matches!(
            parse(&data[..20]),
            Err(Error::Truncated { context: "owner", .. })
        ));
    }

    #[test]
    fn test_parse_truncated_group() {
        let data = payload(&[(0x40, 50, 0, "Living")]);
        assert!(matches!(
            parse(&data[..data.len() - 4]),
            Err(Error::Truncated { context: "group name", .. })
        ));
    }

    #[test]
    fn test_parse_never_panics_on_prefixes() {
        let data = payload(&[(0x40, 50, 0, "Living"), (0x41, 20, 0, "Study")]);
        for end in 0..data.len() {
            assert!(parse(&data[..end]).is_err());
        }
        assert!(parse(&data).is_ok());
    }
}
