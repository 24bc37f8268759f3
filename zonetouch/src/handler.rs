//! State change notifications

use zonetouch_types::DeviceState;

/// Receives device state changes from the listener
///
/// Called synchronously on the listener task, so implementations should
/// return quickly.
pub trait StateHandler: Send + Sync + 'static {
    /// Called with a snapshot after every change
    fn on_state_update(&self, state: &DeviceState);

    /// Called when the connection drops, before reconnecting
    fn on_disconnect(&self) {}
}

impl<F> StateHandler for F
where
    F: Fn(&DeviceState) + Send + Sync + 'static,
{
    fn on_state_update(&self, state: &DeviceState) {
        self(state)
    }
}

/// Handler that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl StateHandler for NoopHandler {
    fn on_state_update(&self, _state: &DeviceState) {}
}
