//! Predictive interpolation of one remote player.
//!
//! Each peer keeps the last accepted snapshot as its target. Every frame the
//! target is extrapolated by its velocity for the time since it arrived,
//! capped at `max_prediction_ms`, and the rendered pose eases toward that
//! prediction with a factor that grows with the positional error.

use glam::Vec3;
use quarry_config::ReconciliationConfig;
use quarry_math::lerp_angle;
use quarry_net::SessionKey;
use tracing::trace;

use crate::color::player_color;
use crate::presence::PresencePayload;

// ---------------------------------------------------------------------------
// Snapshot target
// ---------------------------------------------------------------------------

/// Last accepted snapshot, stamped with the local receive time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Target {
    position: Vec3,
    rotation: f32,
    velocity: Vec3,
    is_mining: bool,
    /// Sender clock; orders snapshots.
    sent_at: u64,
    /// Local clock; drives dead reckoning.
    received_at: u64,
}

// ---------------------------------------------------------------------------
// RemotePlayer
// ---------------------------------------------------------------------------

/// View of a peer. Never authoritative.
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    pub session_key: SessionKey,
    pub user_id: String,
    pub username: String,
    pub color: &'static str,
    target: Option<Target>,
    rendered_position: Vec3,
    rendered_rotation: f32,
    moving: bool,
    motion_changed_at: u64,
    last_seen: u64,
}

impl RemotePlayer {
    pub fn new(
        session_key: SessionKey,
        user_id: impl Into<String>,
        username: impl Into<String>,
        now: u64,
    ) -> Self {
        let username = username.into();
        Self {
            session_key,
            user_id: user_id.into(),
            color: player_color(&username),
            username,
            target: None,
            rendered_position: Vec3::ZERO,
            rendered_rotation: 0.0,
            moving: false,
            motion_changed_at: now,
            last_seen: now,
        }
    }

    /// Accepts a snapshot if it is newer than the current target.
    /// Returns `false` for stale, duplicate, or malformed snapshots.
    pub fn apply_snapshot(&mut self, payload: &PresencePayload, now: u64) -> bool {
        if !payload.is_finite() {
            return false;
        }
        if let Some(target) = &self.target {
            if payload.last_update <= target.sent_at {
                trace!(
                    user = %self.user_id,
                    got = payload.last_update,
                    have = target.sent_at,
                    "Stale snapshot rejected"
                );
                return false;
            }
        }

        let first = self.target.is_none();
        self.target = Some(Target {
            position: payload.position(),
            rotation: payload.rotation,
            velocity: payload.velocity(),
            is_mining: payload.is_mining,
            sent_at: payload.last_update,
            received_at: now,
        });
        self.last_seen = now;

        if first {
            self.rendered_position = payload.position();
            self.rendered_rotation = payload.rotation;
        }
        true
    }

    /// Dead-reckoned position at `now`, or `None` before the first snapshot.
    pub fn predicted_position(&self, now: u64, config: &ReconciliationConfig) -> Option<Vec3> {
        let target = self.target?;
        let elapsed_ms = now.saturating_sub(target.received_at).min(config.max_prediction_ms);
        Some(target.position + target.velocity * (elapsed_ms as f32 / 1000.0))
    }

    /// Advances the rendered pose by one frame.
    pub fn update(&mut self, now: u64, config: &ReconciliationConfig) {
        let Some(target) = self.target else {
            return;
        };
        let Some(predicted) = self.predicted_position(now, config) else {
            return;
        };

        let error = self.rendered_position.distance(predicted);
        let factor = (config.base_lerp + error * config.error_boost).min(config.max_lerp);
        self.rendered_position += (predicted - self.rendered_position) * factor;
        self.rendered_rotation =
            lerp_angle(self.rendered_rotation, target.rotation, config.rotation_lerp);

        self.update_motion(target.velocity, now, config);
    }

    fn update_motion(&mut self, velocity: Vec3, now: u64, config: &ReconciliationConfig) {
        let speed = Vec3::new(velocity.x, 0.0, velocity.z).length();
        if now.saturating_sub(self.motion_changed_at) < config.motion_latch_ms {
            return;
        }
        let next = if self.moving {
            speed >= config.motion_stop_speed
        } else {
            speed > config.motion_start_speed
        };
        if next != self.moving {
            self.moving = next;
            self.motion_changed_at = now;
        }
    }

    pub fn position(&self) -> Vec3 {
        self.rendered_position
    }

    pub fn rotation(&self) -> f32 {
        self.rendered_rotation
    }

    pub fn velocity(&self) -> Vec3 {
        self.target.map_or(Vec3::ZERO, |t| t.velocity)
    }

    pub fn is_mining(&self) -> bool {
        self.target.is_some_and(|t| t.is_mining)
    }

    /// Walk animation flag, with hysteresis.
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn has_snapshot(&self) -> bool {
        self.target.is_some()
    }

    pub fn last_update(&self) -> Option<u64> {
        self.target.map(|t| t.sent_at)
    }

    /// Local time of the last snapshot or presence event.
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    pub(crate) fn touch(&mut self, now: u64) {
        self.last_seen = self.last_seen.max(now);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
