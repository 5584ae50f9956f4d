//! Headless simulator: scripted clients sharing one in-process channel.
//!
//! Each client has its own in-memory backend and wanders the generated
//! world, mining whatever it looks at and chatting now and then.
//!
//! Run with: `cargo run -p quarry-game --bin quarry-sim -- --clients 3`

use clap::Parser;
use glam::Vec2;
use quarry_config::{CliArgs, Config, ConfigError};
use quarry_game::{GameApp, ViewAngles};
use quarry_input::{Action, KeyboardState};
use quarry_net::LoopbackHub;
use quarry_services::{Backend, InMemoryBackend};
use rand::Rng;
use tracing::{info, warn};

/// Frame step of the simulated clock.
const FRAME_MS: u64 = 16;

#[derive(Parser, Debug)]
#[command(name = "quarry-sim", about = "Headless Quarry multiplayer simulation")]
struct SimArgs {
    #[command(flatten)]
    common: CliArgs,

    /// Number of simulated clients.
    #[arg(long, default_value_t = 2)]
    clients: usize,

    /// Frames to simulate.
    #[arg(long, default_value_t = 3_600)]
    frames: u64,
}

/// A scripted client that presses whatever keys its bindings name.
struct Bot {
    name: String,
    backend: InMemoryBackend,
    app: GameApp,
    keyboard: KeyboardState,
    /// Horizontal mouse drift in pixels per frame.
    turn_rate: f32,
    next_turn_at: u64,
}

impl Bot {
    fn set_action(&mut self, action: Action, held: bool) {
        let Some(code) = self.app.bindings().codes(action).first().cloned() else {
            return;
        };
        if held {
            self.keyboard.press(code);
        } else {
            self.keyboard.release(code);
        }
    }

    fn step(&mut self, now: u64, rng: &mut impl Rng) {
        if now >= self.next_turn_at {
            self.turn_rate = rng.random_range(-12.0..12.0);
            self.next_turn_at = now + rng.random_range(1_000..4_000);
        }
        let mining = self.app.store().selected_cube().is_some();
        self.set_action(Action::MoveForward, !mining);
        self.set_action(Action::Jump, !mining && rng.random::<f32>() < 0.02);
        self.set_action(Action::Mine, mining);
        if rng.random::<f32>() < 0.002 {
            self.app.submit_chat(format!("{} checking in", self.name));
        }

        let turn = if mining { 0.0 } else { self.turn_rate };
        self.app.frame_from_keys(now, &self.keyboard, Vec2::new(turn, 0.0));
        self.keyboard.clear_transients();
    }

    /// Taps the withdraw key, then lets the transfer settle.
    fn cash_out(&mut self, now: u64) {
        self.keyboard.release_all();
        self.keyboard.clear_transients();
        self.set_action(Action::Withdraw, true);
        self.app.frame_from_keys(now, &self.keyboard, Vec2::ZERO);
        self.keyboard.clear_transients();
        self.set_action(Action::Withdraw, false);
        self.app.frame_from_keys(now + FRAME_MS, &self.keyboard, Vec2::ZERO);
    }
}

/// Loads the config named on the command line. A broken file falls back to
/// defaults; the error is handed back so it can be logged once logging is up.
fn load_config(args: &CliArgs) -> (Config, Option<ConfigError>) {
    let (mut config, error) = match &args.config {
        Some(dir) => match Config::load_or_create(dir) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
        None => (Config::default(), None),
    };
    config.apply_cli_overrides(args);
    (config, error)
}

fn main() {
    let args = SimArgs::parse();
    let (config, config_error) = load_config(&args.common);
    quarry_log::init_logging(
        config.debug.log_dir.as_deref(),
        cfg!(debug_assertions),
        Some(&config),
    );
    if let Some(e) = config_error {
        warn!("Falling back to default config: {e}");
    }

    info!(
        clients = args.clients,
        frames = args.frames,
        seed = config.world.seed,
        channel = %config.network.channel_name,
        "Starting simulation"
    );

    let hub = LoopbackHub::new();
    let mut bots: Vec<Bot> = (0..args.clients)
        .map(|i| {
            let name = format!("miner-{i}");
            let backend = InMemoryBackend::new();
            backend.sign_in(&format!("user-{i}"), &name, Some(&format!("wallet-{i}")));
            let mut app = GameApp::new(
                config.clone(),
                Box::new(hub.connect(&name)),
                Backend::from_shared(backend.clone()),
            );
            app.set_look(ViewAngles {
                yaw: i as f32,
                pitch: -0.7,
            });
            Bot {
                name,
                backend,
                app,
                keyboard: KeyboardState::new(),
                turn_rate: 0.0,
                next_turn_at: 0,
            }
        })
        .collect();

    let mut rng = rand::rng();
    let start = 1_700_000_000_000u64;
    for frame in 0..args.frames {
        let now = start + frame * FRAME_MS;
        for bot in &mut bots {
            bot.step(now, &mut rng);
        }
    }

    // Cash out, then let the transfers settle.
    let end = start + args.frames * FRAME_MS;
    for bot in &mut bots {
        bot.cash_out(end);
    }

    for bot in &bots {
        let view = bot.app.view();
        info!(
            bot = %bot.name,
            tokens = view.tokens,
            total_mined = view.total_mined,
            transfers = bot.backend.transfers().len(),
            peers = view.remotes.len(),
            chat = view.chat.len(),
            destroyed = view.destroyed_cubes,
            "Client summary"
        );
    }
}
