//! Type definitions for zonetouch
//!
//! The data model shared by the protocol core and the client: zones, the
//! device snapshot and the small enums the controller reports.

pub mod device_state;
pub mod error;
pub mod zone;

pub use device_state::{DeviceState, ServiceDueStatus};
pub use error::{Error, Result};
pub use zone::{GroupStatus, PowerStatus, SpillMask, Zone};
