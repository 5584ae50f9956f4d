//! World transition events.
//!
//! Every [`WorldStore`](crate::WorldStore) transition pushes a [`WorldEvent`].
//! The frame driver drains them once per frame and fans them out to the
//! spatial index, effects, and progress persistence.

use crate::cube::{CubeId, CubeType};

/// Why a mining session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cube broke and the reward was credited.
    Completed,
    /// The player released the mine action.
    Explicit,
    /// The view ray missed the target for the whole grace period.
    TargetLost,
    /// The player moved beyond reach.
    OutOfReach,
    /// The target left the active set through another path.
    TargetMissing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    MiningStarted {
        cube_id: CubeId,
        at: u64,
    },
    /// Emitted exactly once for every `MiningStarted`.
    MiningStopped {
        cube_id: CubeId,
        reason: StopReason,
    },
    CubeDestroyed {
        cube_id: CubeId,
        cube_type: CubeType,
        respawn_at: u64,
    },
    CubeRespawned {
        cube_id: CubeId,
    },
    SelectionChanged {
        cube_id: Option<CubeId>,
    },
    TokensCredited {
        amount: u64,
        balance: u64,
    },
    TokensWithdrawn {
        amount: u64,
        signature: String,
    },
    WithdrawalFailed {
        amount: u64,
        message: String,
    },
}

impl WorldEvent {
    /// True for events that change persisted progress.
    pub fn changes_progress(&self) -> bool {
        matches!(
            self,
            WorldEvent::TokensCredited { .. } | WorldEvent::TokensWithdrawn { .. }
        )
    }
}
