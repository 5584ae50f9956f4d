//! The realtime channel abstraction consumed by presence sync and chat.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::ChannelError;

/// Transient per-connection identifier assigned by the channel. A peer that
/// reconnects gets a new key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(pub String);

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of the channel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Attempting to (re)join the channel.
    Connecting,
    /// Joined and ready to broadcast.
    Connected,
    /// Connection lost or intentionally closed.
    Disconnected,
}

/// Observable connection state backed by a [`watch`] channel.
pub struct ConnectionStateWatch {
    tx: watch::Sender<ConnectionState>,
    rx: watch::Receiver<ConnectionState>,
}

impl Default for ConnectionStateWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStateWatch {
    /// Create a new watch initialized to [`ConnectionState::Disconnected`].
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        Self { tx, rx }
    }

    pub fn set(&self, state: ConnectionState) {
        let _ = self.tx.send(state);
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.rx.clone()
    }

    pub fn current(&self) -> ConnectionState {
        *self.rx.borrow()
    }
}

/// Presence metadata a client tracks for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMeta {
    pub user_id: String,
    pub username: String,
}

/// A broadcast message as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub topic: String,
    pub sender: SessionKey,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message(Envelope),
    PresenceJoin { key: SessionKey, meta: PresenceMeta },
    PresenceLeave { key: SessionKey },
    StateChanged(ConnectionState),
}

/// Pub/sub channel with presence tracking.
///
/// Implementations never block: outbound calls enqueue, inbound events are
/// collected by [`poll`](RealtimeChannel::poll) once per frame.
pub trait RealtimeChannel: Send + Sync {
    /// Key of the current connection, `None` while disconnected.
    fn session_key(&self) -> Option<SessionKey>;

    fn state(&self) -> ConnectionState;

    /// Starts delivering messages on `topic`. Subscriptions survive reconnects.
    fn subscribe(&mut self, topic: &str);

    /// Sends `payload` to every other subscriber of `topic`.
    fn broadcast(&mut self, topic: &str, payload: serde_json::Value) -> Result<(), ChannelError>;

    /// Announces this client's presence to the other members.
    fn track(&mut self, meta: PresenceMeta) -> Result<(), ChannelError>;

    /// Drains every event received since the last call.
    fn poll(&mut self) -> Vec<ChannelEvent>;

    /// Tries to rejoin after a disconnect. On success a new session key is
    /// assigned and presence must be tracked again.
    fn reconnect(&mut self) -> Result<(), ChannelError>;
}
