//! Two clients on one loopback hub, each with its own in-memory backend.

use glam::Vec3;
use quarry_config::Config;
use quarry_game::{FrameInput, GameApp, NoticeKind};
use quarry_net::{ConnectionState, LoopbackHub};
use quarry_physics::MovementInput;
use quarry_services::{Backend, InMemoryBackend, ProgressRecord};
use quarry_world::{Cube, CubeId, CubeType, StopReason, WorldEvent};

const FRAME_MS: u64 = 16;

struct Client {
    backend: InMemoryBackend,
    app: GameApp,
}

fn config() -> Config {
    let mut config = Config::default();
    config.movement.spawn_height = 0.0;
    config
}

/// A single stone cube two units in front of the spawn point.
fn stone_in_front() -> Vec<Cube> {
    vec![Cube::new(CubeId(1), Vec3::new(0.0, 0.5, -2.0), CubeType::Stone)]
}

fn client(hub: &LoopbackHub, user: &str, cubes: Vec<Cube>) -> Client {
    let backend = InMemoryBackend::new();
    backend.sign_in(user, user, Some(&format!("wallet-{user}")));
    let app = GameApp::with_cubes(
        config(),
        cubes,
        Box::new(hub.connect(user)),
        Backend::from_shared(backend.clone()),
    );
    Client { backend, app }
}

/// Pitch from the eye (y = 1.6) to the stone center.
fn look_at_stone() -> f32 {
    (-1.1f32).atan2(2.0)
}

fn mining_input() -> FrameInput {
    FrameInput {
        pitch: look_at_stone(),
        mine_held: true,
        ..Default::default()
    }
}

/// Runs both clients from `from` (inclusive) to `to` (exclusive).
fn run_pair(
    a: &mut Client,
    b: &mut Client,
    from: u64,
    to: u64,
    input_a: &FrameInput,
    input_b: &FrameInput,
) {
    let mut now = from;
    while now < to {
        a.app.frame(now, input_a.clone());
        b.app.frame(now, input_b.clone());
        now += FRAME_MS;
    }
}

fn run(client: &mut Client, from: u64, to: u64, input: &FrameInput) {
    let mut now = from;
    while now < to {
        client.app.frame(now, input.clone());
        now += FRAME_MS;
    }
}

#[test]
fn test_peers_see_each_other_move() {
    let hub = LoopbackHub::new();
    let mut a = client(&hub, "alice", Vec::new());
    let mut b = client(&hub, "bob", Vec::new());

    let walk = FrameInput {
        movement: MovementInput {
            forward: true,
            ..Default::default()
        },
        ..Default::default()
    };
    run_pair(&mut a, &mut b, 0, 2_000, &walk, &FrameInput::default());

    let view_b = b.app.view();
    assert_eq!(view_b.remotes.len(), 1);
    let alice = &view_b.remotes[0];
    assert_eq!(alice.user_id, "alice");

    let actual = a.app.view().position;
    assert!(actual.z < -1.0, "alice walked toward -Z");
    // Snapshots trail by at most one broadcast interval, and dead reckoning
    // closes most of that gap.
    assert!(
        (alice.position - actual).length() < 1.0,
        "rendered {:?} vs actual {actual:?}",
        alice.position
    );
    assert!(alice.moving);

    assert_eq!(a.app.view().remotes.len(), 1);
}

#[test]
fn test_mining_stone_credits_and_persists() {
    let hub = LoopbackHub::new();
    let mut a = client(&hub, "alice", stone_in_front());

    run(&mut a, 0, 2_016, &mining_input());
    let view = a.app.view();
    assert_eq!(view.tokens, 1_000);
    assert_eq!(view.total_mined, 1);
    assert_eq!(view.destroyed_cubes, 1);
    assert_eq!(view.active_cubes, 0);

    // Saved after the debounce window.
    run(&mut a, 2_016, 3_200, &FrameInput::default());
    let record = a.backend.record("alice").unwrap();
    assert_eq!(record.tokens, 1_000);
    assert_eq!(record.total_mined, 1);
}

#[test]
fn test_remote_sees_mining_flag() {
    let hub = LoopbackHub::new();
    let mut a = client(&hub, "alice", stone_in_front());
    let mut b = client(&hub, "bob", Vec::new());

    run_pair(&mut a, &mut b, 0, 500, &mining_input(), &FrameInput::default());
    let alice = b.app.view().remotes.into_iter().find(|r| r.user_id == "alice").unwrap();
    assert!(alice.is_mining);

    run_pair(&mut a, &mut b, 500, 800, &FrameInput::default(), &FrameInput::default());
    let alice = b.app.view().remotes.into_iter().find(|r| r.user_id == "alice").unwrap();
    assert!(!alice.is_mining);
}

#[test]
fn test_releasing_mine_closes_particle_interval() {
    let hub = LoopbackHub::new();
    let mut a = client(&hub, "alice", stone_in_front());

    run(&mut a, 0, 400, &mining_input());
    a.app.frame(400, FrameInput::default());
    let view = a.app.view();
    assert!(view.events.contains(&WorldEvent::MiningStopped {
        cube_id: CubeId(1),
        reason: StopReason::Explicit,
    }));

    run(&mut a, 416, 1_000, &FrameInput::default());
    assert!(a.app.view().cues.is_empty());
    assert_eq!(a.app.view().tokens, 0);
}

#[test]
fn test_withdrawal_success_and_failure() {
    let hub = LoopbackHub::new();
    let mut a = client(&hub, "alice", stone_in_front());
    run(&mut a, 0, 2_016, &mining_input());
    assert_eq!(a.app.view().tokens, 1_000);

    a.backend.fail_withdrawals(Some("ledger offline"));
    let withdraw = FrameInput {
        withdraw: true,
        ..Default::default()
    };
    a.app.frame(2_016, withdraw.clone());
    let view = a.app.view();
    assert_eq!(view.tokens, 1_000, "failed transfer leaves the balance");
    let notice = view.notices.last().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.message.contains("ledger offline"));

    a.backend.fail_withdrawals(None);
    a.app.frame(2_032, withdraw);
    let view = a.app.view();
    assert_eq!(view.tokens, 0);
    assert_eq!(view.notices.last().unwrap().kind, NoticeKind::Success);
    assert_eq!(
        a.backend.transfers(),
        vec![("wallet-alice".to_string(), 1_000, "sig-1-1000".to_string())]
    );
}

#[test]
fn test_chat_between_clients() {
    let hub = LoopbackHub::new();
    let mut a = client(&hub, "alice", Vec::new());
    let mut b = client(&hub, "bob", Vec::new());
    run_pair(&mut a, &mut b, 0, 100, &FrameInput::default(), &FrameInput::default());

    let say = FrameInput {
        chat: Some("  found diamonds  ".to_string()),
        ..Default::default()
    };
    a.app.frame(100, say);
    b.app.frame(100, FrameInput::default());
    b.app.frame(116, FrameInput::default());

    let chat = b.app.view().chat;
    assert_eq!(chat.len(), 1);
    assert_eq!(chat[0].username, "alice");
    assert_eq!(chat[0].message, "found diamonds");
    assert_eq!(a.app.view().chat.len(), 1, "own line shown once");
}

#[test]
fn test_reconnect_restores_presence() {
    let hub = LoopbackHub::new();
    let mut a = client(&hub, "alice", Vec::new());
    let mut b = client(&hub, "bob", Vec::new());
    run_pair(&mut a, &mut b, 0, 300, &FrameInput::default(), &FrameInput::default());
    assert_eq!(a.app.view().remotes.len(), 1);
    let old_key = a.app.session_key().unwrap();

    hub.drop_client(&old_key);
    a.app.frame(300, FrameInput::default());
    let view = a.app.view();
    assert_eq!(view.connection, ConnectionState::Disconnected);
    assert!(view.remotes.is_empty());

    // First retry lands within the jittered initial delay.
    run_pair(&mut a, &mut b, 316, 2_000, &FrameInput::default(), &FrameInput::default());
    assert_eq!(a.app.view().connection, ConnectionState::Connected);
    let new_key = a.app.session_key().unwrap();
    assert_ne!(new_key, old_key);
    assert_eq!(a.app.view().remotes.len(), 1);

    let b_view = b.app.view();
    assert_eq!(b_view.remotes.len(), 1, "alice deduplicated by user id");
    assert_eq!(b_view.remotes[0].user_id, "alice");
}

#[test]
fn test_stored_progress_is_merged_with_local_gains() {
    let hub = LoopbackHub::new();
    let backend = InMemoryBackend::new();
    backend.sign_in("alice", "alice", Some("wallet-alice"));
    backend.put_record(
        "alice",
        ProgressRecord {
            username: "alice".into(),
            tokens: 7_000,
            total_mined: 4,
            public_key: Some("wallet-alice".into()),
            updated_at: 0,
        },
    );
    backend.set_deferred(true);
    let mut a = Client {
        app: GameApp::with_cubes(
            config(),
            stone_in_front(),
            Box::new(hub.connect("alice")),
            Backend::from_shared(backend.clone()),
        ),
        backend,
    };

    // Mine while the load is still outstanding.
    run(&mut a, 0, 2_016, &mining_input());
    assert_eq!(a.app.view().tokens, 1_000);
    assert_eq!(a.backend.save_count(), 0);

    a.backend.set_deferred(false);
    a.backend.flush();
    a.app.frame(2_016, FrameInput::default());
    let view = a.app.view();
    assert_eq!(view.tokens, 8_000);
    assert_eq!(view.total_mined, 5);

    run(&mut a, 2_032, 3_200, &FrameInput::default());
    assert_eq!(a.backend.record("alice").unwrap().tokens, 8_000);
}
