//! Remote players keyed by stable user id.
//!
//! The channel identifies connections by a transient [`SessionKey`]. A peer
//! that reconnects shows up under a new key, often before the leave for its
//! old key arrives. The roster therefore stores players by user id and keeps
//! a key -> user map on the side:
//!
//! - a join for a known user under a new key migrates that player to the new
//!   key and keeps its rendered state, so the avatar does not pop;
//! - a leave is honoured only if it names the player's current key, so the
//!   late leave for a superseded key is ignored;
//! - snapshots are routed through the key map and dropped for unknown keys.

use std::collections::{BTreeMap, HashMap};

use bevy_ecs::prelude::*;
use quarry_config::ReconciliationConfig;
use quarry_net::{PresenceMeta, SessionKey};
use tracing::{info, trace};

use crate::presence::PresencePayload;
use crate::remote::RemotePlayer;

#[derive(Resource, Debug)]
pub struct RemoteRoster {
    local_user_id: String,
    players: BTreeMap<String, RemotePlayer>,
    sessions: HashMap<SessionKey, String>,
    config: ReconciliationConfig,
}

impl RemoteRoster {
    pub fn new(local_user_id: impl Into<String>, config: ReconciliationConfig) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            players: BTreeMap::new(),
            sessions: HashMap::new(),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, user_id: &str) -> Option<&RemotePlayer> {
        self.players.get(user_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.players.values()
    }

    pub fn user_for(&self, key: &SessionKey) -> Option<&str> {
        self.sessions.get(key).map(String::as_str)
    }

    pub fn on_join(&mut self, key: SessionKey, meta: &PresenceMeta, now: u64) {
        if meta.user_id == self.local_user_id {
            return;
        }

        if let Some(player) = self.players.get_mut(&meta.user_id) {
            if player.session_key != key {
                info!(
                    user = %meta.user_id,
                    from = %player.session_key,
                    to = %key,
                    "Remote player migrated to new session"
                );
                self.sessions.remove(&player.session_key);
                player.session_key = key.clone();
            }
            player.username.clone_from(&meta.username);
            player.touch(now);
        } else {
            info!(user = %meta.user_id, username = %meta.username, "Remote player joined");
            self.players.insert(
                meta.user_id.clone(),
                RemotePlayer::new(key.clone(), meta.user_id.clone(), meta.username.clone(), now),
            );
        }
        self.sessions.insert(key, meta.user_id.clone());
    }

    pub fn on_leave(&mut self, key: &SessionKey) {
        let Some(user_id) = self.sessions.remove(key) else {
            trace!(%key, "Leave for unknown or superseded session ignored");
            return;
        };
        let current = self
            .players
            .get(&user_id)
            .is_some_and(|p| p.session_key == *key);
        if current {
            self.players.remove(&user_id);
            info!(user = %user_id, "Remote player left");
        }
    }

    /// Routes a snapshot by session key. Returns `true` if it was accepted.
    pub fn on_snapshot(&mut self, key: &SessionKey, payload: &PresencePayload, now: u64) -> bool {
        let Some(user_id) = self.sessions.get(key) else {
            trace!(%key, "Snapshot from unknown session dropped");
            return false;
        };
        match self.players.get_mut(user_id) {
            Some(player) if player.session_key == *key => player.apply_snapshot(payload, now),
            _ => false,
        }
    }

    /// Advances every remote player and prunes peers silent for longer than
    /// the stale timeout. Returns the pruned user ids.
    pub fn update(&mut self, now: u64) -> Vec<String> {
        let timeout = self.config.stale_peer_timeout_ms;
        let stale: Vec<String> = self
            .players
            .values()
            .filter(|p| now.saturating_sub(p.last_seen()) > timeout)
            .map(|p| p.user_id.clone())
            .collect();
        for user_id in &stale {
            if let Some(player) = self.players.remove(user_id) {
                self.sessions.remove(&player.session_key);
                info!(user = %user_id, "Stale remote player pruned");
            }
        }

        for player in self.players.values_mut() {
            player.update(now, &self.config);
        }
        stale
    }

    /// Drops every remote, e.g. when the local connection is lost.
    pub fn clear(&mut self) {
        if !self.players.is_empty() {
            info!(count = self.players.len(), "Remote roster cleared");
        }
        self.players.clear();
        self.sessions.clear();
    }
}
