//! TCP transport

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};
use zonetouch_core::constants::{DEFAULT_CONNECT_TIMEOUT, READ_BUFFER_SIZE};

use crate::{codec::FrameCodec, error::*, Transport};

/// TCP transport for ZoneTouch 3 controllers
pub struct TcpTransport {
    addr: String,
    port: u16,
    socket_addr: Option<SocketAddr>,
    stream: Option<Framed<TcpStream, FrameCodec>>,
    connect_timeout: Duration,
    keepalive: Option<Duration>,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket_addr: None,
            stream: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            keepalive: Some(Duration::from_secs(60)),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set TCP keepalive idle time, `None` to leave keepalive off
    pub fn with_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.socket_addr {
            return Ok(addr);
        }

        let addr_str = format!("{}:{}", self.addr, self.port);

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();

        let addr = addrs
            .first()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;

        self.socket_addr = Some(*addr);
        Ok(*addr)
    }

    fn configure(&self, stream: &TcpStream) -> Result<()> {
        // Disable Nagle's algorithm, commands are tiny
        stream.set_nodelay(true)?;

        if let Some(idle) = self.keepalive {
            let keepalive = TcpKeepalive::new()
                .with_time(idle)
                .with_interval(idle / 3);
            SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let addr = self.resolve_addr().await?;

        debug!("Connecting to {}...", addr);

        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;

        self.configure(&stream)?;

        debug!("Connected to {}", addr);

        self.stream = Some(Framed::with_capacity(stream, FrameCodec::new(), READ_BUFFER_SIZE));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(framed) = self.stream.take() {
            debug!("Disconnecting from {}...", self.remote_addr());

            // Graceful shutdown
            let mut stream = framed.into_inner();
            let _ = stream.shutdown().await;
        }

        self.socket_addr = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, data: Bytes) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        trace!("Sending {} bytes: {}", data.len(), hex::encode(&data));

        stream.send(data).await
    }

    async fn receive(&mut self) -> Result<Bytes> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        match stream.next().await {
            Some(Ok(frame)) => {
                trace!("Received {} bytes", frame.len());
                Ok(frame)
            }
            Some(Err(e)) => Err(e),
            None => Err(Error::ConnectionClosed),
        }
    }

    fn remote_addr(&self) -> String {
        self.socket_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("TCP transport dropped while still connected");
        }
    }
}
