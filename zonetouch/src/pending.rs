//! Outstanding replies keyed by message id

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace};
use zonetouch_core::Message;

use crate::error::{Error, Result};

/// A decoded reply together with the frame it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub raw: Bytes,
    pub message: Message,
}

pub(crate) type Responder = oneshot::Sender<Result<Option<Reply>>>;

/// What the listener does with a reply before handing it back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Purpose {
    /// Merge like any other frame
    #[default]
    Reply,
    /// Replace the shared state with the full-state payload
    Snapshot,
    /// Apply the spill mask to the shared state
    Spill,
}

struct Waiter {
    respond: Responder,
    deadline: Instant,
    purpose: Purpose,
}

/// Waiters registered by the writer, resolved by the reader
#[derive(Default)]
pub(crate) struct PendingReplies {
    waiters: HashMap<u8, Waiter>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Register a waiter; a stale waiter on the same id is failed
    pub fn insert(
        &mut self,
        message_id: u8,
        respond: Responder,
        deadline: Instant,
        purpose: Purpose,
    ) {
        let waiter = Waiter {
            respond,
            deadline,
            purpose,
        };
        if let Some(stale) = self.waiters.insert(message_id, waiter) {
            let _ = stale.respond.send(Err(Error::Timeout { message_id }));
        }
    }

    pub fn purpose(&self, message_id: u8) -> Option<Purpose> {
        self.waiters.get(&message_id).map(|w| w.purpose)
    }

    /// Hand `reply` to whoever waits on its message id
    ///
    /// Returns `false` when nobody was waiting (a push).
    pub fn resolve(&mut self, reply: Reply) -> bool {
        let message_id = reply.message.message_id();
        match self.waiters.remove(&message_id) {
            Some(waiter) => {
                trace!(message_id, "Reply matched");
                let _ = waiter.respond.send(Ok(Some(reply)));
                true
            }
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.waiters.values().map(|w| w.deadline).min()
    }

    /// Fail every waiter whose deadline has passed
    pub fn expire(&mut self, now: Instant) -> usize {
        let expired: Vec<u8> = self
            .waiters
            .iter()
            .filter(|(_, w)| w.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for message_id in &expired {
            if let Some(waiter) = self.waiters.remove(message_id) {
                debug!(message_id, "Timeout waiting for reply");
                let _ = waiter.respond.send(Err(Error::Timeout {
                    message_id: *message_id,
                }));
            }
        }

        expired.len()
    }

    /// Fail everything still waiting
    pub fn fail_all(&mut self, error: impl Fn() -> Error) {
        for (_, waiter) in self.waiters.drain() {
            let _ = waiter.respond.send(Err(error()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use zonetouch_core::Frame;

    fn reply(message_id: u8) -> Reply {
        let raw = Frame::group_position(message_id, 0, 0).unwrap().encode();
        let message = Message::decode(&raw).unwrap();
        Reply { raw, message }
    }

    #[tokio::test]
    async fn test_resolve_matches_message_id() {
        let mut pending = PendingReplies::new();
        let (tx, rx) = oneshot::channel();
        pending.insert(7, tx, Instant::now() + Duration::from_secs(1), Purpose::Snapshot);

        assert_eq!(pending.purpose(7), Some(Purpose::Snapshot));
        assert_eq!(pending.purpose(8), None);
        assert!(!pending.resolve(reply(8)));
        assert!(pending.resolve(reply(7)));
        assert!(pending.is_empty());

        let received = rx.await.unwrap().unwrap().unwrap();
        assert_eq!(received.message.message_id(), 7);
    }

    #[tokio::test]
    async fn test_expire_only_past_deadlines() {
        let mut pending = PendingReplies::new();
        let now = Instant::now();
        let (early_tx, early_rx) = oneshot::channel();
        let (late_tx, _late_rx) = oneshot::channel();
        pending.insert(1, early_tx, now, Purpose::Reply);
        pending.insert(2, late_tx, now + Duration::from_secs(10), Purpose::Reply);

        assert_eq!(pending.next_deadline(), Some(now));
        assert_eq!(pending.expire(now), 1);
        assert!(matches!(
            early_rx.await.unwrap(),
            Err(Error::Timeout { message_id: 1 })
        ));
        assert_eq!(pending.next_deadline(), Some(now + Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_fail_all() {
        let mut pending = PendingReplies::new();
        let (tx, rx) = oneshot::channel();
        pending.insert(3, tx, Instant::now(), Purpose::Spill);

        pending.fail_all(|| Error::ConnectionLost);

        assert!(pending.is_empty());
        assert!(matches!(rx.await.unwrap(), Err(Error::ConnectionLost)));
    }
}
