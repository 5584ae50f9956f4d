//! Frame-scoped resources shared by the game systems.

use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_2;

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};
use quarry_config::Config;
use quarry_input::{Action, ActionState};
use quarry_math::wrap_angle;
use quarry_net::{RealtimeChannel, ReconnectState};
use quarry_physics::{MovementInput, PlayerBody};
use quarry_world::{EffectCue, WorldEvent};

/// Maximum notices kept for the HUD.
pub const MAX_NOTICES: usize = 8;

/// Look rotation per pixel of mouse motion at sensitivity 1.0.
pub const MOUSE_RADIANS_PER_PIXEL: f32 = 0.002;

/// Pitch stays just short of straight up or down.
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Session configuration, fixed for the lifetime of the app.
#[derive(Resource, Debug, Clone, Default)]
pub struct GameConfig(pub Config);

/// Timestamp shared by every system in one frame.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameClock {
    /// Unix milliseconds.
    pub now: u64,
    pub frame: u64,
}

/// Player intent for one frame.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    pub movement: MovementInput,
    /// View yaw in radians; 0 faces -Z.
    pub yaw: f32,
    /// View pitch in radians; positive looks up.
    pub pitch: f32,
    pub mine_held: bool,
    /// Edge-triggered withdraw request.
    pub withdraw: bool,
    /// Chat line submitted this frame.
    pub chat: Option<String>,
}

impl FrameInput {
    /// Builds the frame input from resolved actions and the current view.
    pub fn from_actions(actions: &ActionState, yaw: f32, pitch: f32) -> Self {
        Self {
            movement: MovementInput {
                forward: actions.held(Action::MoveForward),
                back: actions.held(Action::MoveBack),
                left: actions.held(Action::MoveLeft),
                right: actions.held(Action::MoveRight),
                jump: actions.held(Action::Jump),
            },
            yaw,
            pitch,
            mine_held: actions.held(Action::Mine),
            withdraw: actions.just_pressed(Action::Withdraw),
            chat: None,
        }
    }

    /// Unit view direction for the given yaw and pitch.
    pub fn view_direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(-sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
    }
}

/// Camera angles accumulated from mouse motion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewAngles {
    pub yaw: f32,
    pub pitch: f32,
}

impl ViewAngles {
    /// Turns by a mouse delta in pixels. Moving right turns right, moving
    /// down looks down.
    pub fn apply_mouse(&mut self, delta: Vec2, sensitivity: f32) {
        let scale = MOUSE_RADIANS_PER_PIXEL * sensitivity;
        self.yaw = wrap_angle(self.yaw - delta.x * scale);
        self.pitch = (self.pitch - delta.y * scale).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

/// The locally simulated body.
#[derive(Resource, Debug, Clone, Copy)]
pub struct LocalBody(pub PlayerBody);

/// Everything that happened during the frame, for the renderer and HUD.
#[derive(Resource, Debug, Clone, Default)]
pub struct FrameEvents {
    pub world: Vec<WorldEvent>,
    pub cues: Vec<EffectCue>,
    /// User ids of remote players removed this frame.
    pub departed: Vec<String>,
}

impl FrameEvents {
    pub fn clear(&mut self) {
        self.world.clear();
        self.cues.clear();
        self.departed.clear();
    }
}

/// The realtime channel and its reconnect schedule.
#[derive(Resource)]
pub struct NetworkLink {
    pub channel: Box<dyn RealtimeChannel>,
    pub reconnect: ReconnectState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// A user-visible status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub at: u64,
}

/// Bounded notice list, newest last.
#[derive(Resource, Debug, Clone, Default)]
pub struct Notices {
    entries: VecDeque<Notice>,
}

impl Notices {
    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>, at: u64) {
        self.entries.push_back(Notice {
            kind,
            message: message.into(),
            at,
        });
        while self.entries.len() > MAX_NOTICES {
            self.entries.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use quarry_input::{InputMap, KeyCode, KeyboardState};

    use super::*;

    #[test]
    fn test_notices_are_bounded() {
        let mut notices = Notices::default();
        for i in 0..(MAX_NOTICES as u64 + 3) {
            notices.push(NoticeKind::Info, format!("n{i}"), i);
        }
        assert_eq!(notices.len(), MAX_NOTICES);
        assert_eq!(notices.iter().next().unwrap().message, "n3");
        assert_eq!(notices.latest().unwrap().at, MAX_NOTICES as u64 + 2);
    }

    #[test]
    fn test_view_direction_yaw_zero_faces_negative_z() {
        let input = FrameInput::default();
        let dir = input.view_direction();
        assert!((dir - Vec3::NEG_Z).length() < 1e-6);

        let up = FrameInput {
            pitch: std::f32::consts::FRAC_PI_2,
            ..Default::default()
        };
        assert!((up.view_direction() - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_from_actions_reads_bindings() {
        let map = InputMap::default();
        let mut keyboard = KeyboardState::new();
        keyboard.press(KeyCode::new("KeyW"));
        keyboard.press(KeyCode::mouse(0));
        keyboard.press(KeyCode::new("KeyG"));
        let actions = ActionState::resolve(&map, &keyboard);

        let input = FrameInput::from_actions(&actions, 0.5, -0.1);
        assert!(input.movement.forward);
        assert!(!input.movement.back);
        assert!(input.mine_held);
        assert!(input.withdraw);
        assert_eq!(input.yaw, 0.5);
    }

    #[test]
    fn test_mouse_motion_scaled_by_sensitivity() {
        let mut slow = ViewAngles::default();
        let mut fast = ViewAngles::default();
        slow.apply_mouse(Vec2::new(100.0, 0.0), 1.0);
        fast.apply_mouse(Vec2::new(100.0, 0.0), 2.0);
        assert!((slow.yaw + 0.2).abs() < 1e-6, "moving right turns right");
        assert!((fast.yaw - 2.0 * slow.yaw).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut view = ViewAngles::default();
        view.apply_mouse(Vec2::new(0.0, -10_000.0), 1.0);
        assert!((view.pitch - PITCH_LIMIT).abs() < 1e-6);
        view.apply_mouse(Vec2::new(0.0, 20_000.0), 1.0);
        assert!((view.pitch + PITCH_LIMIT).abs() < 1e-6);
    }
}
