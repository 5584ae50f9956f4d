//! Raw keyboard and mouse input driven through the configured bindings.

use glam::Vec2;
use quarry_config::Config;
use quarry_game::{GameApp, MOUSE_RADIANS_PER_PIXEL};
use quarry_input::{Action, KeyCode, KeyboardState};
use quarry_net::LoopbackHub;
use quarry_services::{Backend, InMemoryBackend};

const FRAME_MS: u64 = 16;

fn app(config: Config) -> (LoopbackHub, InMemoryBackend, GameApp) {
    let hub = LoopbackHub::new();
    let backend = InMemoryBackend::new();
    backend.sign_in("alice", "alice", Some("wallet-alice"));
    let app = GameApp::with_cubes(
        config,
        Vec::new(),
        Box::new(hub.connect("alice")),
        Backend::from_shared(backend.clone()),
    );
    (hub, backend, app)
}

fn grounded_config() -> Config {
    let mut config = Config::default();
    config.movement.spawn_height = 0.0;
    config
}

/// Holds `keyboard` for `frames` frames starting at `from`, returning the next frame time.
fn hold(app: &mut GameApp, keyboard: &mut KeyboardState, from: u64, frames: u64) -> u64 {
    let mut now = from;
    for _ in 0..frames {
        app.frame_from_keys(now, keyboard, Vec2::ZERO);
        keyboard.clear_transients();
        now += FRAME_MS;
    }
    now
}

#[test]
fn test_remapped_key_moves_player() {
    let mut config = grounded_config();
    config
        .input
        .keybindings
        .insert("move_forward".to_string(), "KeyI".to_string());
    let (_hub, _backend, mut app) = app(config);
    assert_eq!(app.bindings().codes(Action::MoveForward), &[KeyCode::from("KeyI")]);

    // The default key no longer does anything.
    let mut keyboard = KeyboardState::new();
    keyboard.press(KeyCode::from("KeyW"));
    let now = hold(&mut app, &mut keyboard, 0, 60);
    assert!(app.view().position.z.abs() < 1e-4);

    keyboard.release(KeyCode::from("KeyW"));
    keyboard.press(KeyCode::from("KeyI"));
    hold(&mut app, &mut keyboard, now, 60);
    assert!(app.view().position.z < -1.0, "walked toward -Z");
}

#[test]
fn test_mouse_turns_view_with_configured_sensitivity() {
    let mut config = grounded_config();
    config.input.mouse_sensitivity = 0.5;
    let (_hub, _backend, mut app) = app(config);

    let keyboard = KeyboardState::new();
    app.frame_from_keys(0, &keyboard, Vec2::new(-200.0, 0.0));
    let expected = 200.0 * MOUSE_RADIANS_PER_PIXEL * 0.5;
    assert!((app.look().yaw - expected).abs() < 1e-6);
    assert!((app.view().yaw - expected).abs() < 1e-6);
}

#[test]
fn test_submitted_chat_goes_out_once() {
    let (_hub, _backend, mut app) = app(grounded_config());
    let keyboard = KeyboardState::new();
    app.frame_from_keys(0, &keyboard, Vec2::ZERO);

    app.submit_chat("hello");
    app.frame_from_keys(FRAME_MS, &keyboard, Vec2::ZERO);
    app.frame_from_keys(2 * FRAME_MS, &keyboard, Vec2::ZERO);
    let chat = app.view().chat;
    assert_eq!(chat.len(), 1);
    assert_eq!(chat[0].message, "hello");
}
