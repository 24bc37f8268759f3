//! Device state structures

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::zone::{GroupStatus, SpillMask, Zone};

/// Service-due indicator reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceDueStatus {
    #[default]
    Unknown,
    No,
    HalfYear,
    OneYear,
    TwoYears,
}

impl From<u8> for ServiceDueStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::No,
            1 => Self::HalfYear,
            2 => Self::OneYear,
            3 => Self::TwoYears,
            _ => Self::Unknown,
        }
    }
}

/// Snapshot of controller and zone data
///
/// Created empty, populated by a full-state fetch and then kept current by
/// merging pushed messages. Zones are only ever created by the full-state
/// path; incremental updates touch existing zones only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceState {
    /// Controller identifier
    pub device_id: String,

    /// Owner name
    pub owner: String,

    /// Raw options byte
    pub options: u8,

    pub service_due: ServiceDueStatus,

    pub password: String,

    pub installer: String,

    pub telephone: String,

    pub hardware_version: String,

    pub firmware_version: String,

    pub boot_version: String,

    pub console_version: String,

    pub console_id: String,

    /// Ambient temperature in degrees Celsius
    pub temperature: f32,

    /// Zones keyed by id
    pub zones: BTreeMap<u8, Zone>,

    /// Time of the last change applied to this snapshot
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zone(&self, id: u8) -> Option<&Zone> {
        self.zones.get(&id)
    }

    /// Zones in ascending id order
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    /// Register a zone discovered by the full-state snapshot
    pub fn insert_zone(&mut self, zone: Zone) {
        self.zones.insert(zone.id, zone);
    }

    pub fn set_temperature(&mut self, temperature: f32) -> bool {
        if self.temperature == temperature {
            return false;
        }
        self.temperature = temperature;
        true
    }

    /// Apply a pushed status record to an existing zone
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownZone`] without mutating anything if the
    /// record references a zone the snapshot does not contain.
    pub fn apply_group_status(&mut self, status: &GroupStatus) -> Result<bool> {
        let zone = self
            .zones
            .get_mut(&status.id)
            .ok_or(Error::UnknownZone(status.id))?;
        Ok(zone.apply_status(status))
    }

    /// Rename an existing zone
    pub fn rename_zone(&mut self, id: u8, name: &str) -> Result<bool> {
        let zone = self.zones.get_mut(&id).ok_or(Error::UnknownZone(id))?;
        if zone.name == name {
            return Ok(false);
        }
        zone.name = name.to_string();
        Ok(true)
    }

    /// Mark each zone spill-eligible according to `mask`
    ///
    /// Returns `true` if any zone's flag flipped.
    pub fn apply_spill_mask(&mut self, mask: SpillMask) -> bool {
        let mut changed = false;
        for zone in self.zones.values_mut() {
            let spill_set = mask.contains(zone.id);
            changed |= zone.spill_set != spill_set;
            zone.spill_set = spill_set;
        }
        changed
    }

    /// Record that the snapshot changed now
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[ID: {}, owner: {}, FW: {}, {:.1}°C, {} zones]",
            self.device_id,
            self.owner,
            self.firmware_version,
            self.temperature,
            self.zones.len()
        )
    }
}
