//! Client configuration

use std::time::Duration;

use zonetouch_core::constants::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT, DEFAULT_RECONNECT_DELAY,
};

/// Connection and timing settings for a [`Client`](crate::Client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,

    pub port: u16,

    pub connect_timeout: Duration,

    /// How long the writer waits for a reply before moving on
    pub command_timeout: Duration,

    /// Pause between a connection fault and the next connect attempt
    pub reconnect_delay: Duration,

    /// TCP keepalive idle time, `None` disables keepalive
    pub keepalive: Option<Duration>,

    /// Command jobs that may wait in the queue
    pub queue_capacity: usize,

    /// Re-fetch the full state after every reconnect
    pub refresh_on_reconnect: bool,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set command reply timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_refresh_on_reconnect(mut self, refresh: bool) -> Self {
        self.refresh_on_reconnect = refresh;
        self
    }

    /// Longest a caller can wait on a reply: the writer's own timeout plus
    /// one reconnect cycle
    pub fn reply_deadline(&self) -> Duration {
        self.command_timeout + self.reconnect_delay + self.connect_timeout
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY),
            keepalive: Some(Duration::from_secs(60)),
            queue_capacity: 32,
            refresh_on_reconnect: true,
        }
    }
}
