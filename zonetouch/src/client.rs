//! High-level controller client

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use zonetouch_core::{frame::peek_message_id, Frame, Message, Payload, Session, SessionState};
use zonetouch_transport::{TcpTransport, Transport};
use zonetouch_types::DeviceState;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::handler::{NoopHandler, StateHandler};
use crate::listener::{refresh_job, Job, Listener, Parked, Request};
use crate::pending::{Purpose, Reply};

/// State shared between the client and its listener task
pub(crate) struct Shared {
    pub config: ClientConfig,
    pub session: Session,
    pub state: RwLock<DeviceState>,
    pub handler: Arc<dyn StateHandler>,
    lifecycle: watch::Sender<SessionState>,
}

impl Shared {
    /// Move the session to `to` and tell watchers
    pub fn publish(&self, to: SessionState) {
        if let Err(e) = self.session.transition(to) {
            debug!(error = %e, "Lifecycle step skipped");
        }
        self.lifecycle.send_replace(self.session.state());
    }
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<Parked>,
}

enum Worker {
    Parked(Parked),
    Running(Running),
    /// The listener task panicked and took the transport with it
    Lost,
}

/// ZoneTouch 3 controller client
///
/// # Examples
///
/// ```no_run
/// use zonetouch::{Client, ClientConfig};
///
/// #[tokio::main]
/// async fn main() -> zonetouch::Result<()> {
///     let client = Client::new(ClientConfig::new("192.168.1.50"));
///
///     client.connect().await?;
///     client.start_listener().await?;
///
///     let state = client.fetch_full_state().await?;
///     for zone in state.zones() {
///         println!("{}", zone);
///     }
///
///     client.set_position(0, 75).await?;
///     client.close().await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    shared: Arc<Shared>,
    worker: Mutex<Worker>,
    commands: mpsc::Sender<Job>,
    fetch_lock: Mutex<()>,
}

impl Client {
    /// Create a client for a TCP controller
    pub fn new(config: ClientConfig) -> Self {
        Self::with_handler(config, NoopHandler)
    }

    /// Create a client that reports state changes to `handler`
    pub fn with_handler(config: ClientConfig, handler: impl StateHandler) -> Self {
        let transport = TcpTransport::new(config.host.clone(), config.port)
            .with_connect_timeout(config.connect_timeout)
            .with_keepalive(config.keepalive);
        Self::with_transport(config, Box::new(transport), handler)
    }

    /// Create a client over any transport
    pub fn with_transport(
        config: ClientConfig,
        transport: Box<dyn Transport>,
        handler: impl StateHandler,
    ) -> Self {
        let (commands, jobs) = mpsc::channel(config.queue_capacity.max(1));
        let (lifecycle, _) = watch::channel(SessionState::Disconnected);

        Self {
            shared: Arc::new(Shared {
                config,
                session: Session::new(),
                state: RwLock::new(DeviceState::new()),
                handler: Arc::new(handler),
                lifecycle,
            }),
            worker: Mutex::new(Worker::Parked(Parked { transport, jobs })),
            commands,
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Connect to the controller
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionFailed`] wrapping the transport failure,
    /// [`Error::AlreadyConnected`] if the socket is still open.
    pub async fn connect(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        let Worker::Parked(parked) = &mut *worker else {
            return Err(Error::AlreadyListening);
        };
        if parked.transport.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        self.shared.session.transition(SessionState::Connecting)?;
        self.shared.lifecycle.send_replace(SessionState::Connecting);

        info!("Connecting to {}...", parked.transport.remote_addr());

        match parked.transport.connect().await {
            Ok(()) => {
                self.shared.publish(SessionState::Connected);
                info!("Connected to {}", parked.transport.remote_addr());
                Ok(())
            }
            Err(e) => {
                self.shared.publish(SessionState::Disconnected);
                Err(Error::ConnectionFailed(e))
            }
        }
    }

    /// Spawn the listener task
    ///
    /// The task owns the socket until [`stop_listener`](Self::stop_listener)
    /// or [`close`](Self::close).
    pub async fn start_listener(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;

        match &*worker {
            Worker::Running(_) => return Err(Error::AlreadyListening),
            Worker::Lost => return Err(Error::NotConnected(self.session_state())),
            Worker::Parked(parked) if !parked.transport.is_connected() => {
                return Err(Error::NotConnected(self.session_state()));
            }
            Worker::Parked(_) => {}
        }

        let Worker::Parked(parked) = std::mem::replace(&mut *worker, Worker::Lost) else {
            return Err(Error::NotConnected(self.session_state()));
        };

        self.shared.publish(SessionState::Listening);

        let cancel = CancellationToken::new();
        let listener = Listener::new(self.shared.clone(), parked, cancel.clone());
        let task = tokio::spawn(listener.run());

        *worker = Worker::Running(Running { cancel, task });
        Ok(())
    }

    /// Stop the listener task, keeping the connection
    ///
    /// Waiting requests fail with [`Error::ConnectionLost`], queued ones with
    /// [`Error::NotConnected`]. Does nothing if the listener isn't running.
    pub async fn stop_listener(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if !matches!(&*worker, Worker::Running(_)) {
            return Ok(());
        }

        let Worker::Running(running) = std::mem::replace(&mut *worker, Worker::Lost) else {
            return Ok(());
        };

        running.cancel.cancel();
        let parked = running.task.await.map_err(|e| {
            warn!(error = %e, "Listener task failed");
            self.shared.publish(SessionState::Disconnected);
            Error::ConnectionLost
        })?;

        let next = if parked.transport.is_connected() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        };
        self.shared.publish(next);

        *worker = Worker::Parked(parked);
        debug!("Listener stopped, session {}", next);
        Ok(())
    }

    /// Stop the listener and close the socket
    ///
    /// Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        self.stop_listener().await?;

        let mut worker = self.worker.lock().await;
        if let Worker::Parked(parked) = &mut *worker {
            if parked.transport.is_connected() {
                info!("Disconnecting from {}...", parked.transport.remote_addr());
            }
            parked.transport.disconnect().await?;
        }

        self.shared.session.close();
        self.shared.lifecycle.send_replace(SessionState::Disconnected);
        Ok(())
    }

    /// Send an encoded frame through the command queue
    ///
    /// With `wait`, resolves to the reply carrying the frame's message id;
    /// otherwise to `None` once the frame has been written.
    pub async fn send(&self, frame: Bytes, wait: bool) -> Result<Option<Reply>> {
        let message_id = peek_message_id(&frame).ok_or(zonetouch_core::Error::FrameTooShort {
            expected: zonetouch_core::constants::HEADER_SIZE,
            actual: frame.len(),
        })?;

        let (request, rx) = Request::new(message_id, frame, wait, Purpose::Reply);
        self.enqueue(vec![request]).await?;
        self.await_reply(rx, message_id).await
    }

    pub async fn send_frame(&self, frame: &Frame, wait: bool) -> Result<Option<Reply>> {
        self.send(frame.encode(), wait).await
    }

    /// Drive a zone's damper to `position` percent
    pub async fn set_position(&self, zone_id: u8, position: u8) -> Result<()> {
        let frame = Frame::group_position(self.shared.session.next_message_id(), zone_id, position)?;
        debug!(zone = zone_id, position, "Setting position");
        self.send_frame(&frame, false).await?;
        Ok(())
    }

    /// Close or re-open a zone
    pub async fn set_closed(&self, zone_id: u8, closed: bool) -> Result<()> {
        let frame = Frame::group_closed(self.shared.session.next_message_id(), zone_id, closed)?;
        debug!(zone = zone_id, closed, "Setting closed");
        self.send_frame(&frame, false).await?;
        Ok(())
    }

    /// Fetch a complete snapshot and the spill configuration
    ///
    /// Both requests go out as one job, so no other command is written in
    /// between. The listener installs the snapshot as soon as it arrives and
    /// applies the spill mask on top, notifying the handler as it goes. A
    /// missing spill reply leaves every `spill_set` false.
    pub async fn fetch_full_state(&self) -> Result<DeviceState> {
        let _guard = self.fetch_lock.lock().await;

        let (job, snapshot_rx, spill_rx) = refresh_job(&self.shared);
        let snapshot_id = job[0].message_id;
        let spill_id = job[1].message_id;
        self.enqueue(job).await?;

        let reply = self
            .await_reply(snapshot_rx, snapshot_id)
            .await?
            .ok_or_else(|| Error::InvalidResponse("Empty full state reply".into()))?;

        if !matches!(reply.message.payload, Payload::FullState(_)) {
            return Err(Error::InvalidResponse(format!(
                "Expected full state, got {:?}",
                reply.message.payload
            )));
        }

        match self.await_reply(spill_rx, spill_id).await {
            Ok(Some(Reply {
                message:
                    Message {
                        payload: Payload::Spill(_),
                        ..
                    },
                ..
            })) => {}
            Ok(_) => warn!(message_id = spill_id, "Spill reply carried no mask"),
            Err(e) => warn!(error = %e, "Spill cross-reference failed"),
        }

        let state = self.state();
        info!(
            device_id = %state.device_id,
            zones = state.zones.len(),
            "Fetched full state"
        );

        Ok(state)
    }

    /// Copy of the current device state
    pub fn state(&self) -> DeviceState {
        self.shared.state.read().clone()
    }

    pub fn session_state(&self) -> SessionState {
        self.shared.session.state()
    }

    /// Watch lifecycle transitions
    pub fn lifecycle(&self) -> watch::Receiver<SessionState> {
        self.shared.lifecycle.subscribe()
    }

    async fn enqueue(&self, job: Job) -> Result<()> {
        let state = self.session_state();
        if !matches!(state, SessionState::Listening | SessionState::Connecting) {
            return Err(Error::NotConnected(state));
        }

        self.commands
            .send(job)
            .await
            .map_err(|_| Error::NotConnected(state))
    }

    async fn await_reply(
        &self,
        rx: oneshot::Receiver<Result<Option<Reply>>>,
        message_id: u8,
    ) -> Result<Option<Reply>> {
        match timeout(self.shared.config.reply_deadline(), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionLost),
            Err(_) => Err(Error::Timeout { message_id }),
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Worker::Running(running) = self.worker.get_mut() {
            running.cancel.cancel();
        }
    }
}
