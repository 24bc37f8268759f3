//! Fake controller for client tests
//!
//! Listens on loopback and lets a test script the controller side of the
//! conversation frame by frame.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use zonetouch::{ClientConfig, DeviceState, StateHandler};
use zonetouch_core::frame::encode_frame;

pub const REMOTE: u8 = 0xB0;
pub const CONSOLE: u8 = 0x90;
pub const MAIN_BOARD: u8 = 0x80;

pub struct FakeController {
    listener: TcpListener,
    pub port: u16,
}

impl FakeController {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        Self { listener, port }
    }

    /// Client config pointing at this controller, with short timings
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new("127.0.0.1")
            .with_port(self.port)
            .with_connect_timeout(Duration::from_secs(2))
            .with_command_timeout(Duration::from_secs(2))
            .with_reconnect_delay(Duration::from_millis(50))
            .with_keepalive(None)
    }

    pub async fn accept(&self) -> Peer {
        let (stream, _) = tokio::time::timeout(Duration::from_secs(5), self.listener.accept())
            .await
            .expect("client never connected")
            .unwrap();
        Peer { stream }
    }
}

/// One accepted client connection
pub struct Peer {
    stream: TcpStream,
}

impl Peer {
    /// Read one complete frame written by the client
    pub async fn read_frame(&mut self) -> Vec<u8> {
        let mut frame = vec![0u8; 10];
        tokio::time::timeout(Duration::from_secs(5), self.stream.read_exact(&mut frame))
            .await
            .expect("no frame from client")
            .unwrap();

        let body_length = u16::from_be_bytes([frame[8], frame[9]]) as usize;
        let mut rest = vec![0u8; body_length + 2];
        self.stream.read_exact(&mut rest).await.unwrap();
        frame.extend(rest);
        frame
    }

    pub async fn write(&mut self, frame: &[u8]) {
        self.stream.write_all(frame).await.unwrap();
        self.stream.flush().await.unwrap();
    }
}

pub fn message_id(frame: &[u8]) -> u8 {
    frame[6]
}

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

/// Full-state reply; zones are `(status byte, position, name)`
pub fn full_state_reply(message_id: u8, zones: &[(u8, u8, &str)]) -> Vec<u8> {
    let mut body = vec![0xFF, 0xF0];
    body.extend(fixed("ZT3-TEST", 8));
    body.extend(fixed("Tester", 16));
    body.push(0);
    body.push(0);
    body.extend(fixed("", 8));
    body.extend(fixed("", 10));
    body.extend(fixed("", 12));
    body.extend(700i16.to_be_bytes());
    for version in ["1.0", "2.0", "3.0", "4.0", "CID"] {
        body.extend(prefixed(version));
    }

    let stride = 20;
    body.extend([zones.len() as u8, stride as u8, 8, 0]);
    for (status, position, name) in zones {
        let mut record = vec![0u8; stride];
        record[0] = *status;
        record[1] = *position;
        record[10..18].copy_from_slice(&fixed(name, 8));
        body.extend(record);
    }

    encode_frame(REMOTE, CONSOLE, message_id, 0x1F, &body).to_vec()
}

/// Sub-command frame from the main board
pub fn subcommand(message_id: u8, sub_type: u8, length: u16, count: u16, records: &[u8]) -> Vec<u8> {
    let mut body = vec![sub_type, 0, 0, 0];
    body.extend(length.to_be_bytes());
    body.extend(count.to_be_bytes());
    body.extend_from_slice(records);
    encode_frame(REMOTE, MAIN_BOARD, message_id, 0xC0, &body).to_vec()
}

pub fn spill_reply(message_id: u8, mask: u8) -> Vec<u8> {
    subcommand(message_id, 0x57, 8, 1, &[0, 0, mask, 0, 0, 0, 0, 0])
}

pub fn sensor_push(message_id: u8, raw: i16) -> Vec<u8> {
    let raw = raw.to_be_bytes();
    subcommand(message_id, 0x2B, 4, 1, &[159, 0, raw[0], raw[1]])
}

/// Group status push; records are `(status byte, position)`
pub fn group_push(message_id: u8, records: &[(u8, u8)]) -> Vec<u8> {
    let mut data = Vec::new();
    for (status, position) in records {
        data.extend([*status, *position, 0, 0, 0, 0, 0, 0]);
    }
    subcommand(message_id, 0x21, 8, records.len() as u16, &data)
}

/// Handler that keeps every notification
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

#[derive(Default)]
struct RecorderInner {
    updates: Mutex<Vec<DeviceState>>,
    disconnects: AtomicUsize,
}

impl Recorder {
    pub fn updates(&self) -> Vec<DeviceState> {
        self.inner.updates.lock().clone()
    }

    pub fn disconnects(&self) -> usize {
        self.inner.disconnects.load(Ordering::SeqCst)
    }
}

impl StateHandler for Recorder {
    fn on_state_update(&self, state: &DeviceState) {
        self.inner.updates.lock().push(state.clone());
    }

    fn on_disconnect(&self) {
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
