//! Effect subscriptions bound to the mining-session lifecycle.
//!
//! The presentation layer never runs its own timers. It feeds drained
//! [`WorldEvent`]s into [`MiningEffects`] and polls it each frame for cues.
//! The particle interval exists only between a `MiningStarted` and its
//! matching `MiningStopped`, whatever the stop reason.

use bevy_ecs::prelude::*;
use glam::Vec3;
use tracing::trace;

use crate::cube::{CubeId, CubeType};
use crate::events::{StopReason, WorldEvent};
use crate::store::WorldStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    MiningStart,
    CubeBreak,
    CubeRespawn,
    Withdraw,
    Error,
}

/// Fire-and-forget instruction for the renderer or audio backend.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectCue {
    Sound(SoundCue),
    /// Small dust burst on the cube being mined.
    ParticleBurst { cube_id: CubeId, position: Vec3 },
    /// Debris burst when a cube breaks.
    BreakBurst { position: Vec3, cube_type: CubeType },
}

#[derive(Debug, Clone, Copy)]
struct ParticleInterval {
    cube_id: CubeId,
    position: Vec3,
    next_at: u64,
}

#[derive(Resource, Debug)]
pub struct MiningEffects {
    interval_ms: u64,
    active: Option<ParticleInterval>,
    cues: Vec<EffectCue>,
}

impl MiningEffects {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            active: None,
            cues: Vec::new(),
        }
    }

    /// True while a particle interval is open.
    pub fn is_emitting(&self) -> bool {
        self.active.is_some()
    }

    /// Reacts to world transitions. `store` resolves cube positions.
    pub fn handle(&mut self, event: &WorldEvent, store: &WorldStore) {
        match event {
            WorldEvent::MiningStarted { cube_id, at } => {
                let position = store
                    .cube(*cube_id)
                    .map(|c| c.position)
                    .unwrap_or(Vec3::ZERO);
                self.active = Some(ParticleInterval {
                    cube_id: *cube_id,
                    position,
                    next_at: *at,
                });
                self.cues.push(EffectCue::Sound(SoundCue::MiningStart));
            }
            WorldEvent::MiningStopped { cube_id, reason } => {
                if self.active.is_some_and(|i| i.cube_id == *cube_id) {
                    trace!(%cube_id, ?reason, "Particle interval closed");
                    self.active = None;
                }
                if *reason == StopReason::Completed {
                    self.cues.push(EffectCue::Sound(SoundCue::CubeBreak));
                }
            }
            WorldEvent::CubeDestroyed {
                cube_id, cube_type, ..
            } => {
                if let Some(cube) = store.destroyed_cube(*cube_id) {
                    self.cues.push(EffectCue::BreakBurst {
                        position: cube.position,
                        cube_type: *cube_type,
                    });
                }
            }
            WorldEvent::CubeRespawned { .. } => {
                self.cues.push(EffectCue::Sound(SoundCue::CubeRespawn));
            }
            WorldEvent::TokensWithdrawn { .. } => {
                self.cues.push(EffectCue::Sound(SoundCue::Withdraw));
            }
            WorldEvent::WithdrawalFailed { .. } => {
                self.cues.push(EffectCue::Sound(SoundCue::Error));
            }
            WorldEvent::SelectionChanged { .. } | WorldEvent::TokensCredited { .. } => {}
        }
    }

    /// Emits any due particle bursts and returns every pending cue.
    pub fn poll(&mut self, now: u64) -> Vec<EffectCue> {
        if let Some(interval) = self.active.as_mut() {
            while interval.next_at <= now {
                self.cues.push(EffectCue::ParticleBurst {
                    cube_id: interval.cube_id,
                    position: interval.position,
                });
                interval.next_at += self.interval_ms;
            }
        }
        std::mem::take(&mut self.cues)
    }
}

impl Default for MiningEffects {
    fn default() -> Self {
        Self::new(100)
    }
}
