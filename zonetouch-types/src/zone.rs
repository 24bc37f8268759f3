//! Zone (group) structures

use std::fmt;

/// Highest zone id the controller can address (6-bit field)
pub const MAX_ZONE_ID: u8 = 0x3F;

/// Power status of a zone, taken from the top two bits of the status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerStatus {
    #[default]
    Off,
    On,
    Turbo,
    /// Slot exists on the controller but no damper is fitted
    NoZone,
}

impl PowerStatus {
    /// Decode from the two power bits (`status >> 6`)
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Off,
            1 => Self::On,
            2 => Self::Turbo,
            _ => Self::NoZone,
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Self::On | Self::Turbo)
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Turbo => "turbo",
            Self::NoZone => "no-zone",
        };
        f.write_str(name)
    }
}

/// One decoded group status record
///
/// Produced both by the full-state snapshot and by pushed
/// `GROUP_CONTROL` updates. Carries no name; names travel separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStatus {
    pub id: u8,
    pub position: u8,
    pub power_status: PowerStatus,
    pub supports_turbo: bool,
    pub spill_on: bool,
}

/// A single damper/vent controlled independently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Zone id (0-63), stable for the lifetime of the device state
    pub id: u8,

    /// User-assigned name (empty until a name arrives)
    pub name: String,

    /// Damper opening in percent (0-100)
    pub position: u8,

    pub power_status: PowerStatus,

    pub supports_turbo: bool,

    /// Zone is currently spilling
    pub spill_on: bool,

    /// Zone is configured as spill-eligible
    pub spill_set: bool,
}

impl Zone {
    /// Create a zone from a status record and its name
    pub fn from_status(status: GroupStatus, name: impl Into<String>) -> Self {
        Self {
            id: status.id,
            name: name.into(),
            position: status.position,
            power_status: status.power_status,
            supports_turbo: status.supports_turbo,
            spill_on: status.spill_on,
            spill_set: false,
        }
    }

    /// Overwrite the live fields from a pushed status record
    ///
    /// Returns `true` if anything changed. `supports_turbo` and `spill_set`
    /// are configuration and are left untouched.
    pub fn apply_status(&mut self, status: &GroupStatus) -> bool {
        let changed = self.position != status.position
            || self.power_status != status.power_status
            || self.spill_on != status.spill_on;

        self.position = status.position;
        self.power_status = status.power_status;
        self.spill_on = status.spill_on;

        changed
    }

    /// Whether the damper is fully closed
    pub fn is_closed(&self) -> bool {
        self.position == 0 || self.power_status == PowerStatus::Off
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Zone[{}: {:?}, {}%, {}{}]",
            self.id,
            self.name,
            self.position,
            self.power_status,
            if self.spill_on { ", spilling" } else { "" }
        )
    }
}

/// Bitmask of spill-eligible zones (bit n = zone n, zones 0-31)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpillMask(pub u32);

impl SpillMask {
    pub fn contains(self, zone_id: u8) -> bool {
        zone_id < 32 && (self.0 >> zone_id) & 1 == 1
    }

    /// Zone ids with their bit set, ascending
    pub fn zones(self) -> impl Iterator<Item = u8> {
        (0..32u8).filter(move |id| self.contains(*id))
    }
}
