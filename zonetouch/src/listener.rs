//! Background listener task
//!
//! One task owns the transport for as long as it runs. It is the only
//! reader of the socket and the only writer: command jobs arrive on an mpsc
//! queue and are written one request at a time, each waiting for its reply
//! (or timeout) before the next is written. Every inbound frame is decoded,
//! merged into the shared device state and then offered to the waiters.
//! Full-state and spill replies are applied here too, so pushes that arrive
//! after a snapshot always merge on top of it.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use zonetouch_core::{Frame, Merge, Message, Payload, SessionState};
use zonetouch_transport::Transport;
use zonetouch_types::DeviceState;

use crate::client::Shared;
use crate::error::{Error, Result};
use crate::pending::{PendingReplies, Purpose, Reply, Responder};

/// One frame to write
pub(crate) struct Request {
    pub message_id: u8,
    pub frame: Bytes,
    pub wait: bool,
    pub purpose: Purpose,
    pub respond: Responder,
}

impl Request {
    pub fn new(
        message_id: u8,
        frame: Bytes,
        wait: bool,
        purpose: Purpose,
    ) -> (Self, oneshot::Receiver<Result<Option<Reply>>>) {
        let (respond, rx) = oneshot::channel();
        let request = Self {
            message_id,
            frame,
            wait,
            purpose,
            respond,
        };
        (request, rx)
    }
}

/// Full-state request followed by the spill request
pub(crate) fn refresh_job(
    shared: &Shared,
) -> (
    Job,
    oneshot::Receiver<Result<Option<Reply>>>,
    oneshot::Receiver<Result<Option<Reply>>>,
) {
    let snapshot_id = shared.session.next_message_id();
    let spill_id = shared.session.next_message_id();

    let (snapshot, snapshot_rx) = Request::new(
        snapshot_id,
        Frame::full_state(snapshot_id).encode(),
        true,
        Purpose::Snapshot,
    );
    let (spill, spill_rx) =
        Request::new(spill_id, Frame::spill(spill_id).encode(), true, Purpose::Spill);

    (vec![snapshot, spill], snapshot_rx, spill_rx)
}

/// Requests written back to back with nothing interleaved
pub(crate) type Job = Vec<Request>;

/// What the listener hands back when it stops
pub(crate) struct Parked {
    pub transport: Box<dyn Transport>,
    pub jobs: mpsc::Receiver<Job>,
}

enum Event {
    Cancelled,
    Frame(zonetouch_transport::Result<Bytes>),
    Deadline,
    Job(Option<Job>),
}

pub(crate) struct Listener {
    shared: Arc<Shared>,
    transport: Box<dyn Transport>,
    jobs: mpsc::Receiver<Job>,
    cancel: CancellationToken,
    pending: PendingReplies,
    current: VecDeque<Request>,
}

impl Listener {
    pub fn new(shared: Arc<Shared>, parked: Parked, cancel: CancellationToken) -> Self {
        Self {
            shared,
            transport: parked.transport,
            jobs: parked.jobs,
            cancel,
            pending: PendingReplies::new(),
            current: VecDeque::new(),
        }
    }

    /// Run until cancelled or until the client is dropped
    pub async fn run(mut self) -> Parked {
        debug!(remote = %self.transport.remote_addr(), "Listener started");

        loop {
            if self.pending.is_empty() {
                if let Some(request) = self.current.pop_front() {
                    if let Err(e) = self.write(request).await {
                        if !self.recover(e).await {
                            break;
                        }
                    }
                    continue;
                }
            }

            let deadline = self.pending.next_deadline();
            let idle = self.pending.is_empty() && self.current.is_empty();

            let event = tokio::select! {
                _ = self.cancel.cancelled() => Event::Cancelled,
                frame = self.transport.receive() => Event::Frame(frame),
                _ = wait_until(deadline) => Event::Deadline,
                job = self.jobs.recv(), if idle => Event::Job(job),
            };

            match event {
                Event::Cancelled => break,
                Event::Frame(Ok(frame)) => self.handle_frame(frame),
                Event::Frame(Err(e)) => {
                    if !self.recover(e).await {
                        break;
                    }
                }
                Event::Deadline => {
                    self.pending.expire(Instant::now());
                }
                Event::Job(Some(job)) => self.current.extend(job),
                Event::Job(None) => {
                    debug!("Command queue closed");
                    break;
                }
            }
        }

        self.shutdown()
    }

    async fn write(&mut self, request: Request) -> zonetouch_transport::Result<()> {
        trace!(message_id = request.message_id, wait = request.wait, "Writing command");

        if let Err(e) = self.transport.send(request.frame).await {
            let _ = request.respond.send(Err(Error::ConnectionLost));
            return Err(e);
        }

        if request.wait {
            let deadline = Instant::now() + self.shared.config.command_timeout;
            self.pending
                .insert(request.message_id, request.respond, deadline, request.purpose);
        } else {
            let _ = request.respond.send(Ok(None));
        }

        Ok(())
    }

    fn handle_frame(&mut self, raw: Bytes) {
        let message = match Message::decode(&raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, frame = %hex_preview(&raw), "Dropping frame");
                return;
            }
        };

        trace!(message_id = message.message_id(), payload = ?message.payload, "Received");

        let purpose = self.pending.purpose(message.message_id());
        let snapshot = {
            let mut state = self.shared.state.write();
            if apply(&mut state, &message, purpose) {
                state.touch();
                Some(state.clone())
            } else {
                None
            }
        };

        if let Some(snapshot) = snapshot {
            self.shared.handler.on_state_update(&snapshot);
        }

        self.pending.resolve(Reply { raw, message });
    }

    /// Reconnect after a fault, retrying until it works or the listener is
    /// cancelled. Returns `false` when cancelled.
    async fn recover(&mut self, cause: zonetouch_transport::Error) -> bool {
        warn!(error = %cause, "Connection lost");

        self.fail_in_flight();
        self.shared.handler.on_disconnect();
        let _ = self.transport.disconnect().await;
        self.shared.publish(SessionState::Connecting);

        let delay = self.shared.config.reconnect_delay;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = sleep(delay) => {}
            }

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return false,
                result = self.transport.connect() => result,
            };

            match result {
                Ok(()) => {
                    info!(remote = %self.transport.remote_addr(), "Reconnected");
                    self.shared.publish(SessionState::Listening);
                    if self.shared.config.refresh_on_reconnect {
                        let (job, _, _) = refresh_job(&self.shared);
                        self.current.extend(job);
                    }
                    return true;
                }
                Err(e) => {
                    warn!(error = %e, "Reconnect failed, retrying in {:?}", delay);
                }
            }
        }
    }

    fn fail_in_flight(&mut self) {
        self.pending.fail_all(|| Error::ConnectionLost);
        for request in self.current.drain(..) {
            let _ = request.respond.send(Err(Error::ConnectionLost));
        }
    }

    fn shutdown(mut self) -> Parked {
        self.fail_in_flight();

        let state = self.shared.session.state();
        while let Ok(job) = self.jobs.try_recv() {
            for request in job {
                let _ = request.respond.send(Err(Error::NotConnected(state)));
            }
        }

        debug!("Listener stopped");

        Parked {
            transport: self.transport,
            jobs: self.jobs,
        }
    }
}

/// Fold one decoded frame into the shared state
fn apply(state: &mut DeviceState, message: &Message, purpose: Option<Purpose>) -> bool {
    match (purpose, &message.payload) {
        (Some(Purpose::Snapshot), Payload::FullState(snapshot)) => {
            info!(
                device_id = %snapshot.device_id,
                zones = snapshot.zones.len(),
                "Installing full state"
            );
            *state = (**snapshot).clone();
            true
        }
        (Some(Purpose::Spill), Payload::Spill(mask)) => state.apply_spill_mask(*mask),
        _ => state.merge(message),
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn hex_preview(raw: &[u8]) -> String {
    hex::encode(&raw[..raw.len().min(32)])
}
