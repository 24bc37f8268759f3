//! Incremental device state updates

use tracing::{debug, warn};
use zonetouch_types::DeviceState;

use crate::message::{Message, Payload};

/// Apply a decoded message to a snapshot
pub trait Merge {
    /// Returns `true` if the snapshot changed
    fn merge(&mut self, message: &Message) -> bool;
}

impl Merge for DeviceState {
    fn merge(&mut self, message: &Message) -> bool {
        match &message.payload {
            Payload::Sensor(Some(temperature)) => self.set_temperature(*temperature),

            Payload::GroupControl(records) => {
                let mut changed = false;
                for record in records {
                    match self.apply_group_status(record) {
                        Ok(updated) => changed |= updated,
                        Err(e) => warn!(error = %e, "Status record ignored"),
                    }
                }
                changed
            }

            Payload::GroupNames(names) => {
                let mut changed = false;
                for (id, name) in names {
                    match self.rename_zone(*id, name) {
                        Ok(updated) => changed |= updated,
                        Err(e) => warn!(error = %e, "Name ignored"),
                    }
                }
                changed
            }

            other => {
                debug!(message_id = message.message_id(), "Nothing to merge from {:?}", other);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MessageType;
    use crate::frame::FrameHeader;
    use pretty_assertions::assert_eq;
    use zonetouch_types::{GroupStatus, PowerStatus, SpillMask, Zone};

    fn message(payload: Payload) -> Message {
        Message {
            header: FrameHeader {
                magic: crate::constants::FRAME_MAGIC,
                destination: 0x80,
                source: 0xB0,
                message_id: 1,
                message_type: 0xC0,
                body_length: 0,
            },
            kind: MessageType::SubCommand,
            sub_type: None,
            payload,
        }
    }

    fn status(id: u8, position: u8, power_status: PowerStatus) -> GroupStatus {
        GroupStatus {
            id,
            position,
            power_status,
            supports_turbo: false,
            spill_on: false,
        }
    }

    fn populated() -> DeviceState {
        let mut state = DeviceState::new();
        state.insert_zone(Zone::from_status(status(0, 50, PowerStatus::On), "Living"));
        state.insert_zone(Zone::from_status(status(1, 0, PowerStatus::Off), "Kitchen"));
        state
    }

    #[test]
    fn test_merge_sensor() {
        let mut state = populated();

        assert!(state.merge(&message(Payload::Sensor(Some(21.5)))));
        assert_eq!(state.temperature, 21.5);

        assert!(!state.merge(&message(Payload::Sensor(Some(21.5)))));
        assert!(!state.merge(&message(Payload::Sensor(None))));
        assert_eq!(state.temperature, 21.5);
    }

    #[test]
    fn test_merge_group_control_is_idempotent() {
        let mut state = populated();
        let update = message(Payload::GroupControl(vec![status(0, 80, PowerStatus::Turbo)]));

        assert!(state.merge(&update));
        let after_first = state.clone();

        assert!(!state.merge(&update));
        assert_eq!(state, after_first);
        assert_eq!(state.zone(0).unwrap().position, 80);
        assert_eq!(state.zone(0).unwrap().power_status, PowerStatus::Turbo);
    }

    #[test]
    fn test_merge_unknown_zone_leaves_state_untouched() {
        let mut state = populated();
        let before = state.clone();

        let update = message(Payload::GroupControl(vec![status(9, 80, PowerStatus::On)]));
        assert!(!state.merge(&update));
        assert_eq!(state, before);
    }

    #[test]
    fn test_merge_applies_known_records_around_unknown() {
        let mut state = populated();

        let update = message(Payload::GroupControl(vec![
            status(9, 80, PowerStatus::On),
            status(1, 30, PowerStatus::On),
        ]));
        assert!(state.merge(&update));
        assert_eq!(state.zone(1).unwrap().position, 30);
        assert_eq!(state.zones.len(), 2);
    }

    #[test]
    fn test_merge_group_names() {
        let mut state = populated();

        let update = message(Payload::GroupNames(vec![(1, "Dining".into()), (7, "Nope".into())]));
        assert!(state.merge(&update));
        assert_eq!(state.zone(1).unwrap().name, "Dining");
        assert!(state.zone(7).is_none());
    }

    #[test]
    fn test_merge_ignores_spill_and_others() {
        let mut state = populated();
        let before = state.clone();

        assert!(!state.merge(&message(Payload::Spill(SpillMask(0b11)))));
        assert!(!state.merge(&message(Payload::Unknown(0x7E))));
        assert_eq!(state, before);
    }
}
