//! Selection hysteresis for the view-ray target.
//!
//! A hit on an active cube replaces the selection immediately. A miss only
//! clears it after a run of consecutive miss frames, longer while mining, so
//! that a ray grazing cube edges does not flicker the selection or cancel
//! a session.

use bevy_ecs::prelude::*;
use quarry_config::MiningConfig;
use tracing::debug;

use crate::cube::CubeId;
use crate::events::StopReason;
use crate::store::WorldStore;

#[derive(Resource, Debug, Clone)]
pub struct TargetTracker {
    idle_grace: u32,
    mining_grace: u32,
    miss_frames: u32,
}

impl TargetTracker {
    pub fn new(config: &MiningConfig) -> Self {
        Self {
            idle_grace: config.idle_grace_frames.max(1),
            mining_grace: config.mining_grace_frames.max(1),
            miss_frames: 0,
        }
    }

    pub fn miss_frames(&self) -> u32 {
        self.miss_frames
    }

    /// Feeds this frame's raycast result into the selection.
    pub fn observe(&mut self, hit: Option<CubeId>, store: &mut WorldStore) {
        if let Some(id) = hit.filter(|id| store.is_active(*id)) {
            self.miss_frames = 0;
            store.set_selected_cube(Some(id));
            return;
        }

        if store.selected_cube().is_none() && !store.is_mining() {
            self.miss_frames = 0;
            return;
        }

        self.miss_frames += 1;
        let grace = if store.is_mining() {
            self.mining_grace
        } else {
            self.idle_grace
        };
        if self.miss_frames >= grace {
            debug!(frames = self.miss_frames, "Target lost");
            self.miss_frames = 0;
            store.set_selected_cube(None);
            store.cancel_mining(StopReason::TargetLost);
        }
    }

    /// Applies the mine action: holding it starts a session on the current
    /// selection, releasing it stops the session.
    pub fn apply_mine_intent(&self, mine_held: bool, now: u64, store: &mut WorldStore) {
        if mine_held {
            if let Some(id) = store.selected_cube() {
                if !store.is_mining() {
                    store.start_mining(id, now);
                }
            }
        } else if store.is_mining() {
            store.stop_mining();
        }
    }
}

impl Default for TargetTracker {
    fn default() -> Self {
        Self::new(&MiningConfig::default())
    }
}
