//! Game systems, one group per [`GameSet`](crate::GameSet).
//!
//! Every system reads the frame time from [`FrameClock`] so the mining
//! check, respawn check, and interpolation of one frame agree on `now`.

use bevy_ecs::prelude::*;
use quarry_multiplayer::{ChatLog, PresenceSync, RemoteRoster};
use quarry_net::ConnectionState;
use quarry_physics::{CubeGrid, raycast_cubes, step_player};
use quarry_services::{
    Backend, Leaderboard, LocalProgress, ProgressEvent, ProgressSync, WithdrawalFlow,
};
use quarry_world::{MiningEffects, TargetTracker, WorldEvent, WorldStore};
use tracing::{debug, info, trace, warn};

use crate::resources::{
    FrameClock, FrameEvents, FrameInput, GameConfig, LocalBody, NetworkLink, NoticeKind, Notices,
};

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Attempts a scheduled reconnect, then drains and routes channel events.
pub fn network_system(
    clock: Res<FrameClock>,
    mut link: ResMut<NetworkLink>,
    mut sync: ResMut<PresenceSync>,
    mut roster: ResMut<RemoteRoster>,
    mut chat: ResMut<ChatLog>,
    mut notices: ResMut<Notices>,
) {
    let now = clock.now;
    let link = &mut *link;

    if link.channel.state() == ConnectionState::Disconnected {
        link.reconnect.on_disconnect(now);
        if link.reconnect.due(now) {
            match link.channel.reconnect() {
                Ok(()) => info!(attempt = link.reconnect.attempts(), "Realtime channel rejoined"),
                Err(e) => {
                    warn!("Reconnect attempt failed: {e}");
                    link.reconnect.on_failure(now);
                    if link.reconnect.exhausted() {
                        notices.push(NoticeKind::Error, "Unable to reach the game server", now);
                    }
                }
            }
        }
    }

    sync.ensure_subscribed(link.channel.as_mut());
    let events = link.channel.poll();
    let summary = sync.route_inbound(events, &mut roster, &mut chat, now);
    if summary.snapshots > 0 {
        trace!(snapshots = summary.snapshots, "Presence snapshots applied");
    }

    match summary.state_change {
        Some(ConnectionState::Disconnected) => {
            link.reconnect.on_disconnect(now);
            notices.push(NoticeKind::Error, "Connection lost, reconnecting", now);
        }
        Some(ConnectionState::Connected) => {
            if link.reconnect.attempts() > 0 {
                notices.push(NoticeKind::Success, "Reconnected", now);
            }
            link.reconnect.reset();
        }
        Some(ConnectionState::Connecting) | None => {}
    }
}

// ---------------------------------------------------------------------------
// Movement and targeting
// ---------------------------------------------------------------------------

pub fn movement_system(
    config: Res<GameConfig>,
    input: Res<FrameInput>,
    grid: Res<CubeGrid>,
    mut body: ResMut<LocalBody>,
    mut store: ResMut<WorldStore>,
) {
    step_player(&mut body.0, &input.movement, input.yaw, &config.0.movement, &*grid);
    store.set_player_pose(body.0.position, input.yaw);
}

/// Casts the view ray and feeds the hit through selection hysteresis, then
/// applies the mine action to the resulting selection.
pub fn targeting_system(
    clock: Res<FrameClock>,
    config: Res<GameConfig>,
    input: Res<FrameInput>,
    body: Res<LocalBody>,
    grid: Res<CubeGrid>,
    mut tracker: ResMut<TargetTracker>,
    mut store: ResMut<WorldStore>,
) {
    let origin = body.0.eye_position(&config.0.movement);
    let reach = store.rules().reach;
    let hit = raycast_cubes(&*grid, origin, input.view_direction(), reach);
    tracker.observe(hit.map(|h| h.cube_id), &mut store);
    tracker.apply_mine_intent(input.mine_held, clock.now, &mut store);
}

// ---------------------------------------------------------------------------
// Mining and withdrawal
// ---------------------------------------------------------------------------

pub fn mining_system(clock: Res<FrameClock>, mut store: ResMut<WorldStore>) {
    let outcome = store.update(clock.now);
    if let Some(mined) = outcome.mined {
        debug!(id = %mined.cube_id, reward = mined.reward, "Cube mined");
    }
}

/// Starts a transfer on the withdraw action and settles the one in flight.
pub fn withdrawal_system(
    clock: Res<FrameClock>,
    input: Res<FrameInput>,
    backend: Res<Backend>,
    mut flow: ResMut<WithdrawalFlow>,
    mut store: ResMut<WorldStore>,
    mut notices: ResMut<Notices>,
) {
    let now = clock.now;

    if input.withdraw {
        match store.begin_withdrawal() {
            Ok(ticket) => {
                if flow.request(backend.wallet.as_ref(), &ticket.public_key, ticket.amount) {
                    notices.push(
                        NoticeKind::Info,
                        format!("Withdrawing {} tokens", ticket.amount),
                        now,
                    );
                } else {
                    store.fail_withdrawal("a withdrawal is already in progress");
                }
            }
            Err(refusal) => notices.push(NoticeKind::Error, refusal.to_string(), now),
        }
    }

    if let Some((amount, result)) = flow.poll() {
        match result {
            Ok(receipt) => {
                let debited = store.confirm_withdrawal(receipt.signature);
                notices.push(NoticeKind::Success, format!("Withdrew {debited} tokens"), now);
            }
            Err(e) => {
                store.fail_withdrawal(e.to_string());
                notices.push(
                    NoticeKind::Error,
                    format!("Withdrawal of {amount} tokens failed: {e}"),
                    now,
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Drains world events and fans them out to the spatial index, effects, and
/// progress persistence.
pub fn world_events_system(
    clock: Res<FrameClock>,
    mut store: ResMut<WorldStore>,
    mut grid: ResMut<CubeGrid>,
    mut effects: ResMut<MiningEffects>,
    mut progress: ResMut<ProgressSync>,
    mut frame: ResMut<FrameEvents>,
) {
    let events = store.drain_events();
    for event in &events {
        match event {
            WorldEvent::CubeDestroyed { cube_id, .. } => {
                grid.remove(*cube_id);
            }
            WorldEvent::CubeRespawned { cube_id } => {
                if let Some(cube) = store.cube(*cube_id) {
                    grid.insert(cube);
                }
            }
            _ => {}
        }
        effects.handle(event, &store);
        if event.changes_progress() {
            progress.mark_changed(clock.now);
        }
    }
    frame.world.extend(events);
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

pub fn presence_broadcast_system(
    clock: Res<FrameClock>,
    input: Res<FrameInput>,
    body: Res<LocalBody>,
    store: Res<WorldStore>,
    mut link: ResMut<NetworkLink>,
    mut sync: ResMut<PresenceSync>,
) {
    let result = sync.broadcast_pose(
        link.channel.as_mut(),
        clock.now,
        body.0.position,
        input.yaw,
        store.is_mining(),
    );
    if let Err(e) = result {
        warn!("Presence broadcast failed: {e}");
    }
}

pub fn chat_send_system(
    clock: Res<FrameClock>,
    mut input: ResMut<FrameInput>,
    store: Res<WorldStore>,
    sync: Res<PresenceSync>,
    mut link: ResMut<NetworkLink>,
    mut chat: ResMut<ChatLog>,
    mut notices: ResMut<Notices>,
) {
    let Some(text) = input.chat.take() else {
        return;
    };
    let now = clock.now;
    match chat.compose(&store.player().username, &text, now) {
        Ok(message) => {
            if let Err(e) = sync.send_chat(link.channel.as_mut(), &message) {
                warn!("Chat send failed: {e}");
                notices.push(NoticeKind::Error, "Message not delivered", now);
            }
        }
        Err(rejection) => notices.push(NoticeKind::Error, rejection.to_string(), now),
    }
}

/// Drives progress load and debounced saves. A late load is merged with
/// whatever was earned locally in the meantime.
pub fn progress_system(
    clock: Res<FrameClock>,
    backend: Res<Backend>,
    mut progress: ResMut<ProgressSync>,
    mut store: ResMut<WorldStore>,
    mut notices: ResMut<Notices>,
) {
    let now = clock.now;
    let player = store.player();
    let local = LocalProgress {
        tokens: player.tokens(),
        total_mined: player.total_mined(),
        public_key: player.wallet.public_key.clone(),
    };

    for event in progress.poll(now, backend.progress.as_ref(), &local) {
        match event {
            ProgressEvent::Loaded(record) => {
                store.hydrate_progress(
                    record.tokens.saturating_add(local.tokens),
                    record.total_mined.saturating_add(local.total_mined),
                    record.public_key,
                );
                if local.tokens > 0 || local.total_mined > 0 {
                    progress.mark_changed(now);
                }
            }
            ProgressEvent::NewPlayer => {
                notices.push(
                    NoticeKind::Info,
                    "Welcome! Your progress is saved automatically",
                    now,
                );
            }
            ProgressEvent::LoadFailed(e) => {
                notices.push(
                    NoticeKind::Error,
                    format!("Saved progress unavailable, playing offline: {e}"),
                    now,
                );
            }
            ProgressEvent::Saved => trace!("Progress saved"),
            ProgressEvent::SaveFailed(e) => debug!("Progress save will be retried: {e}"),
        }
    }
}

pub fn leaderboard_system(
    clock: Res<FrameClock>,
    backend: Res<Backend>,
    mut leaderboard: ResMut<Leaderboard>,
) {
    if leaderboard.poll(clock.now, backend.progress.as_ref()) {
        trace!(rows = leaderboard.entries().len(), "Leaderboard updated");
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

pub fn remote_players_system(
    clock: Res<FrameClock>,
    mut roster: ResMut<RemoteRoster>,
    mut frame: ResMut<FrameEvents>,
) {
    let departed = roster.update(clock.now);
    frame.departed.extend(departed);
}

pub fn effects_system(
    clock: Res<FrameClock>,
    mut effects: ResMut<MiningEffects>,
    mut frame: ResMut<FrameEvents>,
) {
    let cues = effects.poll(clock.now);
    frame.cues.extend(cues);
}
