//! The frame driver: owns the ECS world and runs one schedule pass per frame.

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};
use quarry_config::Config;
use quarry_input::{ActionState, InputMap, KeyboardState};
use quarry_multiplayer::{ChatLog, ChatMessage, PresenceSync, RemoteRoster};
use quarry_net::{
    ConnectionState, PresenceMeta, RealtimeChannel, ReconnectConfig, ReconnectState, SessionKey,
};
use quarry_physics::{CubeGrid, PlayerBody};
use quarry_services::{Backend, Leaderboard, LeaderboardEntry, ProgressSync, WithdrawalFlow};
use quarry_world::{
    Cube, CubeId, EffectCue, LocalPlayer, MiningEffects, MiningSession, PlayerId, TargetTracker,
    WorldEvent, WorldStore, generate_world,
};
use tracing::info;

use crate::resources::{
    FrameClock, FrameEvents, FrameInput, GameConfig, LocalBody, NetworkLink, Notice, Notices,
    ViewAngles,
};
use crate::schedule::build_schedule;

/// Read-only view of a remote player for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteView {
    pub user_id: String,
    pub username: String,
    pub color: &'static str,
    pub position: Vec3,
    pub rotation: f32,
    pub is_mining: bool,
    pub moving: bool,
}

/// Everything the renderer and HUD read after a frame.
#[derive(Debug, Clone)]
pub struct FrameView {
    pub now: u64,
    pub frame: u64,
    pub position: Vec3,
    pub yaw: f32,
    pub grounded: bool,
    pub tokens: u64,
    pub total_mined: u64,
    pub selected: Option<CubeId>,
    pub mining: Option<MiningSession>,
    pub mining_progress: f32,
    pub active_cubes: usize,
    pub destroyed_cubes: usize,
    pub withdrawal_pending: bool,
    pub connection: ConnectionState,
    pub remotes: Vec<RemoteView>,
    pub chat: Vec<ChatMessage>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub notices: Vec<Notice>,
    /// World events drained this frame.
    pub events: Vec<WorldEvent>,
    /// Effect cues emitted this frame.
    pub cues: Vec<EffectCue>,
}

pub struct GameApp {
    world: World,
    schedule: Schedule,
    bindings: InputMap,
    look: ViewAngles,
    mouse_sensitivity: f32,
    /// Chat line submitted from the UI, sent with the next keyboard frame.
    outgoing_chat: Option<String>,
}

impl GameApp {
    /// Starts a session on the procedurally generated world.
    pub fn new(config: Config, channel: Box<dyn RealtimeChannel>, backend: Backend) -> Self {
        let cubes = generate_world(&config.world);
        Self::with_cubes(config, cubes, channel, backend)
    }

    /// Starts a session on an explicit cube set.
    pub fn with_cubes(
        config: Config,
        cubes: Vec<Cube>,
        mut channel: Box<dyn RealtimeChannel>,
        backend: Backend,
    ) -> Self {
        let (user_id, username, public_key) = match backend.auth.current_user() {
            Some(user) => (user.id, user.username, user.wallet_public_key),
            None => {
                let id = guest_id(channel.session_key().as_ref());
                (id.clone(), id, None)
            }
        };

        let movement = &config.movement;
        let spawn = Vec3::new(
            0.0,
            movement.floor_height + movement.player_half_height + movement.spawn_height,
            0.0,
        );
        let mut player = LocalPlayer::new(PlayerId(user_id.clone()), username.clone());
        player.wallet.public_key = public_key;
        player.position = spawn;

        let bindings = InputMap::with_overrides(&config.input.keybindings);
        let mouse_sensitivity = config.input.mouse_sensitivity;

        let grid = CubeGrid::from_cubes(&cubes);
        let store = WorldStore::new(cubes, player, config.mining.clone());

        let mut sync = PresenceSync::new(
            PresenceMeta {
                user_id: user_id.clone(),
                username,
            },
            &config.network,
        );
        sync.ensure_subscribed(channel.as_mut());

        let mut progress = ProgressSync::new(config.persistence.clone());
        progress.start(backend.auth.as_ref(), backend.progress.as_ref());
        let mut leaderboard = Leaderboard::new(&config.persistence);
        leaderboard.start(backend.progress.as_ref());

        let mut world = World::new();
        world.insert_resource(FrameClock::default());
        world.insert_resource(FrameInput::default());
        world.insert_resource(FrameEvents::default());
        world.insert_resource(Notices::default());
        world.insert_resource(LocalBody(PlayerBody::new(spawn)));
        world.insert_resource(TargetTracker::new(&config.mining));
        world.insert_resource(MiningEffects::new(config.mining.particle_interval_ms));
        world.insert_resource(grid);
        world.insert_resource(store);
        world.insert_resource(NetworkLink {
            channel,
            reconnect: ReconnectState::new(ReconnectConfig::from(&config.network)),
        });
        world.insert_resource(RemoteRoster::new(user_id.clone(), config.reconciliation.clone()));
        world.insert_resource(ChatLog::new(config.chat.clone()));
        world.insert_resource(sync);
        world.insert_resource(backend);
        world.insert_resource(progress);
        world.insert_resource(WithdrawalFlow::new());
        world.insert_resource(leaderboard);
        world.insert_resource(GameConfig(config));

        info!(user = %user_id, "Game session ready");
        Self {
            world,
            schedule: build_schedule(),
            bindings,
            look: ViewAngles::default(),
            mouse_sensitivity,
            outgoing_chat: None,
        }
    }

    /// Runs one frame at `now` (Unix milliseconds) with the given input.
    pub fn frame(&mut self, now: u64, input: FrameInput) {
        {
            let mut clock = self.world.resource_mut::<FrameClock>();
            clock.now = now;
            clock.frame += 1;
        }
        self.world.insert_resource(input);
        self.world.resource_mut::<FrameEvents>().clear();
        self.schedule.run(&mut self.world);
    }

    /// Runs one frame from raw device state: keys resolve through the
    /// configured bindings and the mouse delta (pixels) turns the view.
    /// The caller clears the keyboard's transients afterwards.
    pub fn frame_from_keys(&mut self, now: u64, keyboard: &KeyboardState, mouse_delta: Vec2) {
        self.look.apply_mouse(mouse_delta, self.mouse_sensitivity);
        let actions = ActionState::resolve(&self.bindings, keyboard);
        let mut input = FrameInput::from_actions(&actions, self.look.yaw, self.look.pitch);
        input.chat = self.outgoing_chat.take();
        self.frame(now, input);
    }

    /// Queues a chat line for the next [`frame_from_keys`](Self::frame_from_keys).
    pub fn submit_chat(&mut self, text: impl Into<String>) {
        self.outgoing_chat = Some(text.into());
    }

    pub fn bindings(&self) -> &InputMap {
        &self.bindings
    }

    pub fn look(&self) -> ViewAngles {
        self.look
    }

    pub fn set_look(&mut self, look: ViewAngles) {
        self.look = look;
    }

    pub fn view(&self) -> FrameView {
        let clock = self.world.resource::<FrameClock>();
        let body = self.world.resource::<LocalBody>().0;
        let store = self.world.resource::<WorldStore>();
        let link = self.world.resource::<NetworkLink>();
        let roster = self.world.resource::<RemoteRoster>();
        let frame = self.world.resource::<FrameEvents>();
        let player = store.player();

        FrameView {
            now: clock.now,
            frame: clock.frame,
            position: body.position,
            yaw: player.yaw,
            grounded: body.grounded,
            tokens: player.tokens(),
            total_mined: player.total_mined(),
            selected: store.selected_cube(),
            mining: store.mining_session(),
            mining_progress: store.mining_progress(clock.now),
            active_cubes: store.active_count(),
            destroyed_cubes: store.destroyed_count(),
            withdrawal_pending: store.withdrawal_pending(),
            connection: link.channel.state(),
            remotes: roster
                .players()
                .map(|p| RemoteView {
                    user_id: p.user_id.clone(),
                    username: p.username.clone(),
                    color: p.color,
                    position: p.position(),
                    rotation: p.rotation(),
                    is_mining: p.is_mining(),
                    moving: p.is_moving(),
                })
                .collect(),
            chat: self.world.resource::<ChatLog>().messages().cloned().collect(),
            leaderboard: self.world.resource::<Leaderboard>().entries().to_vec(),
            notices: self.world.resource::<Notices>().iter().cloned().collect(),
            events: frame.world.clone(),
            cues: frame.cues.clone(),
        }
    }

    /// Current session key, `None` while disconnected.
    pub fn session_key(&self) -> Option<SessionKey> {
        self.world.resource::<NetworkLink>().channel.session_key()
    }

    pub fn store(&self) -> &WorldStore {
        self.world.resource::<WorldStore>()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

fn guest_id(key: Option<&SessionKey>) -> String {
    match key {
        Some(key) => format!("guest-{key}"),
        None => "guest".to_string(),
    }
}
