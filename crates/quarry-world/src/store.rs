//! The world-state store: single owner of cube membership, the mining
//! session, selection, and the local player's token accounting.
//!
//! Every cube lives in exactly one of two maps, `active` or `destroyed`.
//! Transitions move a cube between them inside one `&mut self` call, so no
//! reader can observe a cube in both maps or in neither.
//!
//! All operations take an explicit `now` (milliseconds) so that a frame can
//! run the mining check and the respawn check against the same instant.

use std::collections::BTreeMap;

use bevy_ecs::prelude::*;
use glam::Vec3;
use quarry_config::MiningConfig;
use tracing::{debug, info};

use crate::cube::{Cube, CubeId, CubeType};
use crate::events::{StopReason, WorldEvent};
use crate::player::LocalPlayer;

/// An open mining attempt. At most one exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningSession {
    pub cube_id: CubeId,
    pub started_at: u64,
}

/// Result of a completed mining session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinedCube {
    pub cube_id: CubeId,
    pub cube_type: CubeType,
    pub reward: u64,
    pub respawn_at: u64,
}

/// What one [`WorldStore::update`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    pub mined: Option<MinedCube>,
    pub respawned: Vec<CubeId>,
}

/// Transfer request handed to the wallet collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalTicket {
    pub public_key: String,
    pub amount: u64,
}

/// Why a withdrawal could not be started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WithdrawRefusal {
    #[error("a withdrawal is already in progress")]
    InFlight,
    #[error("no tokens to withdraw")]
    NothingToWithdraw,
    #[error("no wallet is linked to this account")]
    NoWallet,
}

#[derive(Resource)]
pub struct WorldStore {
    active: BTreeMap<CubeId, Cube>,
    destroyed: BTreeMap<CubeId, Cube>,
    mining: Option<MiningSession>,
    selected: Option<CubeId>,
    player: LocalPlayer,
    rules: MiningConfig,
    pending_withdrawal: Option<u64>,
    events: Vec<WorldEvent>,
}

impl WorldStore {
    /// Builds the store from the generated layout. Every cube starts active.
    pub fn new(
        cubes: impl IntoIterator<Item = Cube>,
        player: LocalPlayer,
        rules: MiningConfig,
    ) -> Self {
        let active = cubes
            .into_iter()
            .map(|mut cube| {
                cube.health = cube.max_health;
                cube.respawn_at = None;
                (cube.id, cube)
            })
            .collect();
        Self {
            active,
            destroyed: BTreeMap::new(),
            mining: None,
            selected: None,
            player,
            rules,
            pending_withdrawal: None,
            events: Vec::new(),
        }
    }

    // --- Queries ---

    /// Active cube by id.
    pub fn cube(&self, id: CubeId) -> Option<&Cube> {
        self.active.get(&id)
    }

    pub fn destroyed_cube(&self, id: CubeId) -> Option<&Cube> {
        self.destroyed.get(&id)
    }

    pub fn is_active(&self, id: CubeId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn is_destroyed(&self, id: CubeId) -> bool {
        self.destroyed.contains_key(&id)
    }

    pub fn active_cubes(&self) -> impl Iterator<Item = &Cube> {
        self.active.values()
    }

    pub fn destroyed_cubes(&self) -> impl Iterator<Item = &Cube> {
        self.destroyed.values()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed.len()
    }

    pub fn mining_session(&self) -> Option<MiningSession> {
        self.mining
    }

    pub fn is_mining(&self) -> bool {
        self.mining.is_some()
    }

    pub fn selected_cube(&self) -> Option<CubeId> {
        self.selected
    }

    pub fn player(&self) -> &LocalPlayer {
        &self.player
    }

    pub fn rules(&self) -> &MiningConfig {
        &self.rules
    }

    pub fn withdrawal_pending(&self) -> bool {
        self.pending_withdrawal.is_some()
    }

    /// Fraction of the mining duration elapsed, in `[0, 1]`. Zero when idle.
    pub fn mining_progress(&self, now: u64) -> f32 {
        match self.mining {
            Some(session) => progress(session.started_at, now, self.rules.mining_duration_ms),
            None => 0.0,
        }
    }

    // --- Player pose and hydration ---

    /// Records the locally simulated pose. Position feeds the reach check.
    pub fn set_player_pose(&mut self, position: Vec3, yaw: f32) {
        self.player.position = position;
        self.player.yaw = yaw;
    }

    /// Seeds progress loaded from persistence at session start.
    pub fn hydrate_progress(&mut self, tokens: u64, total_mined: u64, public_key: Option<String>) {
        self.player.tokens = tokens;
        self.player.total_mined = total_mined;
        if public_key.is_some() {
            self.player.wallet.public_key = public_key;
        }
        info!(tokens, total_mined, "Progress restored");
    }

    // --- Selection ---

    /// Pure UI intent. Does not touch the mining session.
    pub fn set_selected_cube(&mut self, id: Option<CubeId>) {
        if self.selected != id {
            self.selected = id;
            self.events.push(WorldEvent::SelectionChanged { cube_id: id });
        }
    }

    // --- Mining ---

    /// Opens a session on `id`. No-op (returns `false`) when a session is
    /// already open or the cube is not active.
    pub fn start_mining(&mut self, id: CubeId, now: u64) -> bool {
        if self.mining.is_some() || !self.active.contains_key(&id) {
            return false;
        }
        self.mining = Some(MiningSession {
            cube_id: id,
            started_at: now,
        });
        self.events.push(WorldEvent::MiningStarted { cube_id: id, at: now });
        debug!(%id, now, "Mining started");
        true
    }

    /// Explicit stop. Idempotent.
    pub fn stop_mining(&mut self) -> bool {
        self.cancel_mining(StopReason::Explicit)
    }

    /// Closes the open session, if any, restoring the target's health.
    pub fn cancel_mining(&mut self, reason: StopReason) -> bool {
        let Some(session) = self.mining.take() else {
            return false;
        };
        if let Some(cube) = self.active.get_mut(&session.cube_id) {
            cube.health = cube.max_health;
        }
        self.events.push(WorldEvent::MiningStopped {
            cube_id: session.cube_id,
            reason,
        });
        debug!(id = %session.cube_id, ?reason, "Mining stopped");
        true
    }

    /// Advances the open session. Completes it once the mining duration has
    /// elapsed: the cube moves to the destroyed set, the reward is credited,
    /// the session closes, and the selection clears, all in this call.
    pub fn tick(&mut self, now: u64) -> Option<MinedCube> {
        let session = self.mining?;

        let Some(cube) = self.active.get(&session.cube_id) else {
            self.cancel_mining(StopReason::TargetMissing);
            return None;
        };

        let max_distance = self.rules.reach + self.rules.reach_margin;
        if cube.position.distance(self.player.position) > max_distance {
            self.cancel_mining(StopReason::OutOfReach);
            return None;
        }

        let elapsed = now.saturating_sub(session.started_at);
        if elapsed < self.rules.mining_duration_ms {
            let remaining = 1.0 - progress(session.started_at, now, self.rules.mining_duration_ms);
            if let Some(cube) = self.active.get_mut(&session.cube_id) {
                cube.health = ((cube.max_health as f32) * remaining).ceil() as u32;
            }
            return None;
        }

        self.complete(session, now)
    }

    fn complete(&mut self, session: MiningSession, now: u64) -> Option<MinedCube> {
        let mut cube = self.active.remove(&session.cube_id)?;
        let respawn_at = now.saturating_add(self.rules.respawn_duration_ms);
        let reward = cube.cube_type.reward();
        let mined = MinedCube {
            cube_id: cube.id,
            cube_type: cube.cube_type,
            reward,
            respawn_at,
        };

        cube.health = 0;
        cube.respawn_at = Some(respawn_at);
        self.destroyed.insert(cube.id, cube);

        self.player.tokens = self.player.tokens.saturating_add(reward);
        self.player.total_mined = self.player.total_mined.saturating_add(1);
        self.mining = None;

        self.events.push(WorldEvent::MiningStopped {
            cube_id: mined.cube_id,
            reason: StopReason::Completed,
        });
        self.events.push(WorldEvent::CubeDestroyed {
            cube_id: mined.cube_id,
            cube_type: mined.cube_type,
            respawn_at,
        });
        self.events.push(WorldEvent::TokensCredited {
            amount: reward,
            balance: self.player.tokens,
        });
        self.set_selected_cube(None);

        info!(
            id = %mined.cube_id,
            cube_type = mined.cube_type.name(),
            reward,
            balance = self.player.tokens,
            "Cube mined"
        );
        Some(mined)
    }

    /// Returns every destroyed cube whose respawn time has passed to the
    /// active set at full health. All due cubes are handled in one pass.
    pub fn check_respawns(&mut self, now: u64) -> Vec<CubeId> {
        let due: Vec<CubeId> = self
            .destroyed
            .values()
            .filter(|cube| cube.respawn_at.is_some_and(|at| at <= now))
            .map(|cube| cube.id)
            .collect();

        for id in &due {
            if let Some(mut cube) = self.destroyed.remove(id) {
                cube.health = cube.max_health;
                cube.respawn_at = None;
                self.active.insert(*id, cube);
                self.events.push(WorldEvent::CubeRespawned { cube_id: *id });
            }
        }
        if !due.is_empty() {
            debug!(count = due.len(), "Cubes respawned");
        }
        due
    }

    /// One frame of world simulation: mining then respawns, both at `now`.
    pub fn update(&mut self, now: u64) -> FrameOutcome {
        let mined = self.tick(now);
        let respawned = self.check_respawns(now);
        FrameOutcome { mined, respawned }
    }

    // --- Withdrawal ---

    /// Reserves the full balance for a transfer. The balance is untouched
    /// until [`confirm_withdrawal`](Self::confirm_withdrawal).
    pub fn begin_withdrawal(&mut self) -> Result<WithdrawalTicket, WithdrawRefusal> {
        if self.pending_withdrawal.is_some() {
            return Err(WithdrawRefusal::InFlight);
        }
        if self.player.tokens == 0 {
            return Err(WithdrawRefusal::NothingToWithdraw);
        }
        let public_key = self
            .player
            .wallet
            .public_key
            .clone()
            .ok_or(WithdrawRefusal::NoWallet)?;

        let amount = self.player.tokens;
        self.pending_withdrawal = Some(amount);
        Ok(WithdrawalTicket { public_key, amount })
    }

    /// Applies a confirmed transfer. Tokens mined while the transfer was in
    /// flight stay in the balance. Returns the amount debited.
    pub fn confirm_withdrawal(&mut self, signature: impl Into<String>) -> u64 {
        let Some(amount) = self.pending_withdrawal.take() else {
            return 0;
        };
        self.player.tokens = self.player.tokens.saturating_sub(amount);
        let signature = signature.into();
        info!(amount, %signature, "Withdrawal confirmed");
        self.events.push(WorldEvent::TokensWithdrawn { amount, signature });
        amount
    }

    /// Releases the reservation without touching the balance.
    pub fn fail_withdrawal(&mut self, message: impl Into<String>) {
        let Some(amount) = self.pending_withdrawal.take() else {
            return;
        };
        self.events.push(WorldEvent::WithdrawalFailed {
            amount,
            message: message.into(),
        });
    }

    // --- Events ---

    /// Takes every event pushed since the last drain.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }
}

fn progress(started_at: u64, now: u64, duration_ms: u64) -> f32 {
    if duration_ms == 0 {
        return 1.0;
    }
    let elapsed = now.saturating_sub(started_at);
    (elapsed as f32 / duration_ms as f32).clamp(0.0, 1.0)
}
