//! Subscriber registry (§4.1): per-user bounded outbound buffer and
//! non-blocking broadcast.
//!
//! Callers are expected to hold the owning mission's exclusive lock for the
//! whole lifetime of `add`/`remove`/`broadcast` — this struct has no
//! locking of its own, by design, so that iteration during broadcast can
//! never race a concurrent `add`/`remove`.

use crate::types::Message;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Outbound channel capacity per connected user.
pub const SUBSCRIBER_BUFFER: usize = 1000;

#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("user already joined")]
    AlreadyJoined,
    #[error("user not found")]
    NotFound,
}

/// Map from user id to that user's outbound message channel.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: HashMap<String, mpsc::Sender<Message>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user`, returning the receiving half of its outbound
    /// channel. Errors if `user` is already present.
    pub fn add(&mut self, user: &str) -> Result<mpsc::Receiver<Message>, SubscriberError> {
        if self.subscribers.contains_key(user) {
            return Err(SubscriberError::AlreadyJoined);
        }
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers.insert(user.to_string(), tx);
        Ok(rx)
    }

    /// Remove `user`. Dropping the sender closes the channel; the reader
    /// task observes end-of-stream on its next poll.
    pub fn remove(&mut self, user: &str) -> Result<(), SubscriberError> {
        self.subscribers.remove(user).map(|_| ()).ok_or(SubscriberError::NotFound)
    }

    /// Deliver `msg` to every current subscriber without blocking. A full
    /// channel drops the message for that subscriber only.
    pub fn broadcast(&self, msg: &Message) {
        for (user, tx) in &self.subscribers {
            if tx.try_send(msg.clone()).is_err() {
                warn!(user, "subscriber channel full, dropping message");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
