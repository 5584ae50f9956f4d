//! Text chat: validation, per-sender rate limiting, and bounded history.
//!
//! Outgoing messages are validated and rate limited by [`ChatLog::compose`]
//! and shown locally straight away. Incoming messages are validated the same
//! way per sender, deduplicated by id (which also drops the echo of our own
//! messages), and appended to a bounded history.

use std::collections::{HashMap, HashSet, VecDeque};

use bevy_ecs::prelude::*;
use quarry_config::ChatConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::player_color;

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// A chat line as broadcast on the chat topic.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique per message; used for dedup.
    pub id: String,
    pub username: String,
    pub message: String,
    /// Display colour of the sender.
    pub color: String,
    /// Sender clock, Unix milliseconds.
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// RateTracker
// ---------------------------------------------------------------------------

/// Sliding-window rate tracker.
#[derive(Debug, Clone)]
pub struct RateTracker {
    /// Timestamps of accepted messages within the current window.
    timestamps: VecDeque<u64>,
    max_count: u32,
    window_ms: u64,
}

impl RateTracker {
    pub fn new(max_count: u32, window_ms: u64) -> Self {
        Self {
            timestamps: VecDeque::new(),
            max_count,
            window_ms,
        }
    }

    /// Returns `true` and records `now` if within the rate limit.
    pub fn allow(&mut self, now: u64) -> bool {
        while self
            .timestamps
            .front()
            .is_some_and(|t| now.saturating_sub(*t) >= self.window_ms)
        {
            self.timestamps.pop_front();
        }
        if self.timestamps.len() as u32 >= self.max_count {
            return false;
        }
        self.timestamps.push_back(now);
        true
    }
}

// ---------------------------------------------------------------------------
// ChatRejection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatRejection {
    #[error("message is empty")]
    Empty,
    #[error("message exceeds {0} characters")]
    TooLong(usize),
    #[error("sending too fast, slow down")]
    RateLimited,
    #[error("duplicate message")]
    Duplicate,
}

// ---------------------------------------------------------------------------
// ChatLog
// ---------------------------------------------------------------------------

#[derive(Resource, Debug)]
pub struct ChatLog {
    config: ChatConfig,
    history: VecDeque<ChatMessage>,
    /// Ids currently in `history`.
    ids: HashSet<String>,
    own_rate: RateTracker,
    peer_rates: HashMap<String, RateTracker>,
    sequence: u64,
}

impl ChatLog {
    pub fn new(config: ChatConfig) -> Self {
        let own_rate = RateTracker::new(config.rate_limit_messages, config.rate_limit_window_ms);
        Self {
            config,
            history: VecDeque::new(),
            ids: HashSet::new(),
            own_rate,
            peer_rates: HashMap::new(),
            sequence: 0,
        }
    }

    fn validate_text(&self, text: &str) -> Result<(), ChatRejection> {
        if text.trim().is_empty() {
            return Err(ChatRejection::Empty);
        }
        if text.chars().count() > self.config.max_message_length {
            return Err(ChatRejection::TooLong(self.config.max_message_length));
        }
        Ok(())
    }

    /// Builds an outgoing message and appends it to the local history. The
    /// caller broadcasts the returned message.
    pub fn compose(
        &mut self,
        username: &str,
        text: &str,
        now: u64,
    ) -> Result<ChatMessage, ChatRejection> {
        let text = text.trim();
        self.validate_text(text)?;
        if !self.own_rate.allow(now) {
            return Err(ChatRejection::RateLimited);
        }

        self.sequence += 1;
        let message = ChatMessage {
            id: format!("{username}-{now}-{}", self.sequence),
            username: username.to_string(),
            message: text.to_string(),
            color: player_color(username).to_string(),
            timestamp: now,
        };
        self.push(message.clone());
        Ok(message)
    }

    /// Accepts a message from the channel. `now` is the local receive time.
    pub fn receive(&mut self, message: ChatMessage, now: u64) -> Result<(), ChatRejection> {
        if self.ids.contains(&message.id) {
            return Err(ChatRejection::Duplicate);
        }
        self.validate_text(&message.message)?;
        let (max_count, window_ms) = (
            self.config.rate_limit_messages,
            self.config.rate_limit_window_ms,
        );
        let allowed = self
            .peer_rates
            .entry(message.username.clone())
            .or_insert_with(|| RateTracker::new(max_count, window_ms))
            .allow(now);
        if !allowed {
            debug!(username = %message.username, "Chat message rate limited");
            return Err(ChatRejection::RateLimited);
        }
        self.push(message);
        Ok(())
    }

    fn push(&mut self, message: ChatMessage) {
        self.ids.insert(message.id.clone());
        self.history.push_back(message);
        while self.history.len() > self.config.history_size {
            if let Some(evicted) = self.history.pop_front() {
                self.ids.remove(&evicted.id);
            }
        }
    }

    /// Oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
