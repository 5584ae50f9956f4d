//! Glue between the realtime channel and the multiplayer state.
//!
//! Outbound: throttled presence snapshots with a velocity estimated from the
//! displacement since the previous broadcast, and chat lines.
//! Inbound: channel events routed to the [`RemoteRoster`] and [`ChatLog`].

use bevy_ecs::prelude::*;
use glam::Vec3;
use quarry_config::NetworkConfig;
use quarry_net::{
    BroadcastThrottle, ChannelError, ChannelEvent, ConnectionState, PresenceMeta, RealtimeChannel,
};
use tracing::{debug, warn};

use crate::chat::{ChatLog, ChatMessage};
use crate::presence::PresencePayload;
use crate::roster::RemoteRoster;

/// What one inbound pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundSummary {
    pub snapshots: usize,
    pub chat_messages: usize,
    /// Last connection-state transition seen in this pass.
    pub state_change: Option<ConnectionState>,
}

#[derive(Resource, Debug)]
pub struct PresenceSync {
    meta: PresenceMeta,
    presence_topic: String,
    chat_topic: String,
    throttle: BroadcastThrottle,
    /// Time and position of the previous broadcast.
    last_sample: Option<(u64, Vec3)>,
    tracked: bool,
    subscribed: bool,
}

impl PresenceSync {
    pub fn new(meta: PresenceMeta, config: &NetworkConfig) -> Self {
        Self {
            meta,
            presence_topic: scoped_topic(&config.channel_name, &config.presence_topic),
            chat_topic: scoped_topic(&config.channel_name, &config.chat_topic),
            throttle: BroadcastThrottle::new(config.broadcast_interval_ms),
            last_sample: None,
            tracked: false,
            subscribed: false,
        }
    }

    pub fn meta(&self) -> &PresenceMeta {
        &self.meta
    }

    pub fn presence_topic(&self) -> &str {
        &self.presence_topic
    }

    pub fn chat_topic(&self) -> &str {
        &self.chat_topic
    }

    /// Subscribes to the presence and chat topics once.
    pub fn ensure_subscribed(&mut self, channel: &mut dyn RealtimeChannel) {
        if !self.subscribed {
            channel.subscribe(&self.presence_topic);
            channel.subscribe(&self.chat_topic);
            self.subscribed = true;
        }
    }

    /// Sends a presence snapshot if connected and the throttle allows.
    /// Returns `Ok(true)` when a snapshot went out.
    pub fn broadcast_pose(
        &mut self,
        channel: &mut dyn RealtimeChannel,
        now: u64,
        position: Vec3,
        rotation: f32,
        is_mining: bool,
    ) -> Result<bool, ChannelError> {
        if channel.state() != ConnectionState::Connected {
            return Ok(false);
        }
        if !self.tracked {
            channel.track(self.meta.clone())?;
            self.tracked = true;
            self.throttle.reset();
        }
        if !self.throttle.try_acquire(now) {
            return Ok(false);
        }

        let velocity = match self.last_sample {
            Some((then, previous)) if now > then => {
                (position - previous) / ((now - then) as f32 / 1000.0)
            }
            _ => Vec3::ZERO,
        };
        let payload = PresencePayload::new(position, rotation, is_mining, velocity, now);
        channel.broadcast(&self.presence_topic, serde_json::to_value(payload)?)?;
        self.last_sample = Some((now, position));
        Ok(true)
    }

    pub fn send_chat(
        &self,
        channel: &mut dyn RealtimeChannel,
        message: &ChatMessage,
    ) -> Result<(), ChannelError> {
        channel.broadcast(&self.chat_topic, serde_json::to_value(message)?)
    }

    /// Routes a batch of channel events.
    pub fn route_inbound(
        &mut self,
        events: Vec<ChannelEvent>,
        roster: &mut RemoteRoster,
        chat: &mut ChatLog,
        now: u64,
    ) -> InboundSummary {
        let mut summary = InboundSummary::default();
        for event in events {
            match event {
                ChannelEvent::Message(envelope) if envelope.topic == self.presence_topic => {
                    match serde_json::from_value::<PresencePayload>(envelope.payload) {
                        Ok(payload) => {
                            if roster.on_snapshot(&envelope.sender, &payload, now) {
                                summary.snapshots += 1;
                            }
                        }
                        Err(e) => {
                            debug!(sender = %envelope.sender, "Malformed presence payload: {e}")
                        }
                    }
                }
                ChannelEvent::Message(envelope) if envelope.topic == self.chat_topic => {
                    match serde_json::from_value::<ChatMessage>(envelope.payload) {
                        Ok(message) => {
                            if chat.receive(message, now).is_ok() {
                                summary.chat_messages += 1;
                            }
                        }
                        Err(e) => debug!(sender = %envelope.sender, "Malformed chat payload: {e}"),
                    }
                }
                ChannelEvent::Message(envelope) => {
                    debug!(topic = %envelope.topic, "Message on unexpected topic");
                }
                ChannelEvent::PresenceJoin { key, meta } => roster.on_join(key, &meta, now),
                ChannelEvent::PresenceLeave { key } => roster.on_leave(&key),
                ChannelEvent::StateChanged(state) => {
                    match state {
                        ConnectionState::Disconnected => {
                            warn!("Realtime channel disconnected");
                            roster.clear();
                            self.tracked = false;
                            self.last_sample = None;
                        }
                        ConnectionState::Connected => {
                            // A fresh session key needs presence tracked again.
                            self.tracked = false;
                        }
                        ConnectionState::Connecting => {}
                    }
                    summary.state_change = Some(state);
                }
            }
        }
        summary
    }
}

/// Topics live under the shared channel name, so clients joined to another
/// world never exchange snapshots or chat.
fn scoped_topic(channel_name: &str, topic: &str) -> String {
    format!("{channel_name}:{topic}")
}
