//! In-process realtime hub.
//!
//! Every [`LoopbackChannel`] created from one [`LoopbackHub`] sees the others'
//! broadcasts and presence, exactly as clients of a hosted realtime service
//! would. The hub can drop a client or refuse reconnects to exercise the
//! disconnect and migration paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info};

use crate::channel::{
    ChannelEvent, ConnectionState, ConnectionStateWatch, Envelope, PresenceMeta, RealtimeChannel,
    SessionKey,
};
use crate::error::ChannelError;

struct Member {
    tx: Sender<ChannelEvent>,
    topics: HashSet<String>,
    presence: Option<PresenceMeta>,
}

#[derive(Default)]
struct HubInner {
    members: HashMap<SessionKey, Member>,
    next_key: u64,
    refuse_connections: bool,
}

impl HubInner {
    fn allocate_key(&mut self, label: &str) -> SessionKey {
        self.next_key += 1;
        SessionKey(format!("{label}-{}", self.next_key))
    }

    fn join(&mut self, key: SessionKey, tx: Sender<ChannelEvent>, topics: HashSet<String>) {
        self.members.insert(
            key,
            Member {
                tx,
                topics,
                presence: None,
            },
        );
    }

    /// Removes a member and announces the leave if it had tracked presence.
    fn leave(&mut self, key: &SessionKey) -> Option<Member> {
        let member = self.members.remove(key)?;
        if member.presence.is_some() {
            for other in self.members.values() {
                let _ = other.tx.send(ChannelEvent::PresenceLeave { key: key.clone() });
            }
        }
        Some(member)
    }
}

/// Shared hub. Cheap to clone.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        lock(&self.inner)
    }

    /// Creates a connected client. `label` prefixes its session keys.
    pub fn connect(&self, label: &str) -> LoopbackChannel {
        let (tx, rx) = crossbeam_channel::unbounded();
        let state = ConnectionStateWatch::new();
        let mut inner = self.lock();
        let key = inner.allocate_key(label);
        inner.join(key.clone(), tx.clone(), HashSet::new());
        state.set(ConnectionState::Connected);
        let _ = tx.send(ChannelEvent::StateChanged(ConnectionState::Connected));
        debug!(%key, "Loopback client connected");

        LoopbackChannel {
            hub: Arc::clone(&self.inner),
            label: label.to_string(),
            key: Some(key),
            topics: HashSet::new(),
            tx,
            rx,
            state,
        }
    }

    /// Drops a client as if its connection failed.
    pub fn drop_client(&self, key: &SessionKey) {
        let mut inner = self.lock();
        if let Some(member) = inner.leave(key) {
            info!(%key, "Loopback client dropped");
            let _ = member
                .tx
                .send(ChannelEvent::StateChanged(ConnectionState::Disconnected));
        }
    }

    /// While set, reconnect attempts fail with [`ChannelError::Refused`].
    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connections = refuse;
    }

    pub fn member_count(&self) -> usize {
        self.lock().members.len()
    }
}

fn lock(inner: &Mutex<HubInner>) -> MutexGuard<'_, HubInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One client of a [`LoopbackHub`].
pub struct LoopbackChannel {
    hub: Arc<Mutex<HubInner>>,
    label: String,
    key: Option<SessionKey>,
    topics: HashSet<String>,
    tx: Sender<ChannelEvent>,
    rx: Receiver<ChannelEvent>,
    state: ConnectionStateWatch,
}

impl LoopbackChannel {
    /// Subscribe to connection-state transitions.
    pub fn state_watch(&self) -> tokio::sync::watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Leaves the hub voluntarily.
    pub fn close(&mut self) {
        if let Some(key) = self.key.take() {
            lock(&self.hub).leave(&key);
        }
        self.state.set(ConnectionState::Disconnected);
    }

    fn connected_key(&self) -> Result<&SessionKey, ChannelError> {
        match (&self.key, self.state.current()) {
            (Some(key), ConnectionState::Connected) => Ok(key),
            _ => Err(ChannelError::NotConnected),
        }
    }
}

impl RealtimeChannel for LoopbackChannel {
    fn session_key(&self) -> Option<SessionKey> {
        self.key.clone()
    }

    fn state(&self) -> ConnectionState {
        self.state.current()
    }

    fn subscribe(&mut self, topic: &str) {
        self.topics.insert(topic.to_string());
        if let Some(key) = &self.key {
            if let Some(member) = lock(&self.hub).members.get_mut(key) {
                member.topics.insert(topic.to_string());
            }
        }
    }

    fn broadcast(&mut self, topic: &str, payload: serde_json::Value) -> Result<(), ChannelError> {
        let key = self.connected_key()?.clone();
        let inner = lock(&self.hub);
        if !inner.members.contains_key(&key) {
            return Err(ChannelError::Closed);
        }
        let envelope = Envelope {
            topic: topic.to_string(),
            sender: key.clone(),
            payload,
        };
        for (other_key, member) in &inner.members {
            if *other_key != key && member.topics.contains(topic) {
                let _ = member.tx.send(ChannelEvent::Message(envelope.clone()));
            }
        }
        Ok(())
    }

    fn track(&mut self, meta: PresenceMeta) -> Result<(), ChannelError> {
        let key = self.connected_key()?.clone();
        let mut inner = lock(&self.hub);
        let Some(member) = inner.members.get_mut(&key) else {
            return Err(ChannelError::Closed);
        };
        member.presence = Some(meta.clone());

        for (other_key, other) in &inner.members {
            if *other_key == key {
                continue;
            }
            let _ = other.tx.send(ChannelEvent::PresenceJoin {
                key: key.clone(),
                meta: meta.clone(),
            });
            // Initial sync: the new member learns about everyone already here.
            if let Some(existing) = &other.presence {
                let _ = self.tx.send(ChannelEvent::PresenceJoin {
                    key: other_key.clone(),
                    meta: existing.clone(),
                });
            }
        }
        Ok(())
    }

    fn poll(&mut self) -> Vec<ChannelEvent> {
        let events: Vec<ChannelEvent> = self.rx.try_iter().collect();
        for event in &events {
            if let ChannelEvent::StateChanged(state) = event {
                if *state == ConnectionState::Disconnected {
                    self.key = None;
                }
                self.state.set(*state);
            }
        }
        events
    }

    fn reconnect(&mut self) -> Result<(), ChannelError> {
        if self.state.current() == ConnectionState::Connected {
            return Ok(());
        }
        self.state.set(ConnectionState::Connecting);
        let mut inner = lock(&self.hub);
        if inner.refuse_connections {
            self.state.set(ConnectionState::Disconnected);
            return Err(ChannelError::Refused);
        }
        if let Some(stale) = self.key.take() {
            inner.leave(&stale);
        }
        let key = inner.allocate_key(&self.label);
        inner.join(key.clone(), self.tx.clone(), self.topics.clone());
        drop(inner);

        info!(%key, "Loopback client reconnected");
        self.key = Some(key);
        self.state.set(ConnectionState::Connected);
        let _ = self
            .tx
            .send(ChannelEvent::StateChanged(ConnectionState::Connected));
        Ok(())
    }
}

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock(&self.hub).leave(&key);
        }
    }
}
