//! Wire shape of a presence snapshot.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One throttled snapshot of a player's pose, as broadcast on the presence
/// topic. Velocity is in world units per second; `last_update` is the
/// sender's clock in milliseconds and only orders snapshots from one sender.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub position: [f32; 3],
    pub rotation: f32,
    pub is_mining: bool,
    pub velocity: [f32; 3],
    pub last_update: u64,
}

impl PresencePayload {
    pub fn new(
        position: Vec3,
        rotation: f32,
        is_mining: bool,
        velocity: Vec3,
        last_update: u64,
    ) -> Self {
        Self {
            position: position.to_array(),
            rotation,
            is_mining,
            velocity: velocity.to_array(),
            last_update,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }

    /// Rejects payloads carrying NaN or infinite values.
    pub fn is_finite(&self) -> bool {
        self.position().is_finite() && self.velocity().is_finite() && self.rotation.is_finite()
    }
}
