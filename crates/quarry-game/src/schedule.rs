//! System sets and the frame schedule.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

use crate::systems;

/// Stages of one frame, run in declaration order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameSet {
    /// Reconnect if due, drain the channel, route presence and chat.
    Network,
    /// Integrate input into the local body.
    Movement,
    /// Raycast the view, apply selection hysteresis and the mine action.
    Targeting,
    /// Advance the mining session, respawns, and withdrawal.
    Mining,
    /// Drain world events and fan them out.
    Events,
    /// Outbound presence and chat, progress and leaderboard persistence.
    Sync,
    /// Remote interpolation and effect cues.
    Presentation,
}

impl GameSet {
    pub const ALL: [GameSet; 7] = [
        GameSet::Network,
        GameSet::Movement,
        GameSet::Targeting,
        GameSet::Mining,
        GameSet::Events,
        GameSet::Sync,
        GameSet::Presentation,
    ];
}

/// Builds the single-threaded frame schedule with every game system.
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.configure_sets(
        (
            GameSet::Network,
            GameSet::Movement,
            GameSet::Targeting,
            GameSet::Mining,
            GameSet::Events,
            GameSet::Sync,
            GameSet::Presentation,
        )
            .chain(),
    );

    schedule.add_systems(systems::network_system.in_set(GameSet::Network));
    schedule.add_systems(systems::movement_system.in_set(GameSet::Movement));
    schedule.add_systems(systems::targeting_system.in_set(GameSet::Targeting));
    schedule.add_systems(
        (systems::mining_system, systems::withdrawal_system)
            .chain()
            .in_set(GameSet::Mining),
    );
    schedule.add_systems(systems::world_events_system.in_set(GameSet::Events));
    schedule.add_systems(
        (
            systems::presence_broadcast_system,
            systems::chat_send_system,
            systems::progress_system,
            systems::leaderboard_system,
        )
            .chain()
            .in_set(GameSet::Sync),
    );
    schedule.add_systems(
        (systems::remote_players_system, systems::effects_system)
            .chain()
            .in_set(GameSet::Presentation),
    );
    schedule
}
