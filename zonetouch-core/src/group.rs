//! Group status records

use bitflags::bitflags;
use zonetouch_types::{GroupStatus, PowerStatus};

use crate::constants::GROUP_RECORD_SIZE;
use crate::error::{Error, Result};

bitflags! {
    /// Flags byte (offset 6) of a group status record
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GroupFlags: u8 {
        const SUPPORTS_TURBO = 0x80;
        const SPILL_ON = 0x02;
    }
}

/// Decode one 8-byte group status record
///
/// ```text
/// ┌────────┬──────────┬──────────┬───────┬──────────┐
/// │ status │ position │ reserved │ flags │ reserved │
/// │ 1 byte │  1 byte  │ 4 bytes  │ 1 byte│  1 byte  │
/// └────────┴──────────┴──────────┴───────┴──────────┘
/// status = power(2 bits) | zone id(6 bits)
/// ```
pub fn decode_status(record: &[u8]) -> Result<GroupStatus> {
    if record.len() < GROUP_RECORD_SIZE {
        return Err(Error::Truncated {
            context: "group record",
            needed: GROUP_RECORD_SIZE,
            available: record.len(),
        });
    }

    let status = record[0];
    let flags = GroupFlags::from_bits_truncate(record[6]);

    Ok(GroupStatus {
        id: status & 0x3F,
        position: record[1],
        power_status: PowerStatus::from_bits(status >> 6),
        supports_turbo: flags.contains(GroupFlags::SUPPORTS_TURBO),
        spill_on: flags.contains(GroupFlags::SPILL_ON),
    })
}

/// Decode a fixed-width text field: lossy UTF-8, NULs and whitespace trimmed
pub fn decode_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_status() {
        // power=ON (0b01), zone 5, 75% open, turbo capable and spilling
        let record = [0x45, 75, 0, 0, 0, 0, 0x82, 0];
        let status = decode_status(&record).unwrap();

        assert_eq!(
            status,
            GroupStatus {
                id: 5,
                position: 75,
                power_status: PowerStatus::On,
                supports_turbo: true,
                spill_on: true,
            }
        );
    }

    #[test]
    fn test_decode_status_turbo_power() {
        let status = decode_status(&[0x80 | 12, 100, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(status.id, 12);
        assert_eq!(status.power_status, PowerStatus::Turbo);
        assert!(!status.supports_turbo);
        assert!(!status.spill_on);
    }

    #[test]
    fn test_decode_status_short() {
        assert!(matches!(
            decode_status(&[0x01, 0x02]),
            Err(Error::Truncated { needed: 8, available: 2, .. })
        ));
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(b"Kitchen\0\0\0"), "Kitchen");
        assert_eq!(decode_text(b"  Bed 2 \0"), "Bed 2");
        assert_eq!(decode_text(b"\0\0\0\0"), "");
    }
}
