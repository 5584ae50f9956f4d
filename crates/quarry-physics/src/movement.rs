//! Per-frame kinematic movement for the local player.
//!
//! Units are world units per frame. The body is a box of
//! `player_half_width x player_half_height x player_half_width` half extents,
//! positioned by its center.
//!
//! Collision is resolved in two phases:
//! - horizontal: the full XZ move is tested first; on a side hit the X-only
//!   and Z-only moves are tried independently, which gives wall sliding.
//! - vertical: landing snaps the body onto the highest supporting cube top,
//!   an upward hit zeroes vertical velocity, anything else moves freely.
//!
//! A hard floor at `floor_height` catches the body regardless of cubes.

use glam::Vec3;
use quarry_config::MovementConfig;
use quarry_math::Aabb;
use tracing::trace;

use crate::index::CubeIndex;

/// Movement keys held this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl MovementInput {
    /// Unit-length (or zero) direction in view space: x = strafe right,
    /// y = forward.
    pub fn direction(&self) -> glam::Vec2 {
        let axis = |pos: bool, neg: bool| (pos as i8 - neg as i8) as f32;
        glam::Vec2::new(axis(self.right, self.left), axis(self.forward, self.back))
            .normalize_or_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
}

impl PlayerBody {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            grounded: false,
        }
    }

    pub fn aabb(&self, config: &MovementConfig) -> Aabb {
        body_box(self.position, config)
    }

    pub fn eye_position(&self, config: &MovementConfig) -> Vec3 {
        self.position + Vec3::Y * config.eye_offset
    }

    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }
}

fn body_box(center: Vec3, config: &MovementConfig) -> Aabb {
    Aabb::from_center_half_extents(
        center,
        Vec3::new(
            config.player_half_width,
            config.player_half_height,
            config.player_half_width,
        ),
    )
}

/// View-space to world-space basis for a yaw about +Y. Yaw 0 faces -Z.
fn yaw_basis(yaw: f32) -> (Vec3, Vec3) {
    let (sin, cos) = yaw.sin_cos();
    let forward = Vec3::new(-sin, 0.0, -cos);
    let right = Vec3::new(cos, 0.0, -sin);
    (forward, right)
}

/// True when `candidate` overlaps any cube other than as a landing contact.
/// A landing contact is one where the body's bottom is within `tolerance`
/// of the cube top and the body is not moving up.
fn side_blocked(
    candidate: Vec3,
    vertical_velocity: f32,
    config: &MovementConfig,
    index: &dyn CubeIndex,
) -> bool {
    let body = body_box(candidate, config);
    let bottom = body.min.y;
    index.query_aabb(&body).iter().any(|cube| {
        let landing =
            bottom >= cube.aabb.max.y - config.landing_tolerance && vertical_velocity <= 0.0;
        !landing
    })
}

/// Advances `body` by one frame.
pub fn step_player(
    body: &mut PlayerBody,
    input: &MovementInput,
    yaw: f32,
    config: &MovementConfig,
    index: &dyn CubeIndex,
) {
    // Horizontal velocity: smoothed toward the input direction.
    let dir = input.direction();
    let (forward, right) = yaw_basis(yaw);
    let target = (forward * dir.y + right * dir.x) * config.move_speed;
    body.velocity.x += (target.x - body.velocity.x) * config.smoothing;
    body.velocity.z += (target.z - body.velocity.z) * config.smoothing;

    // Vertical velocity: jump from the ground, otherwise gravity.
    if input.jump && body.grounded {
        body.velocity.y = config.jump_velocity;
    } else {
        body.velocity.y = (body.velocity.y - config.gravity).max(-config.terminal_velocity);
    }

    resolve_horizontal(body, config, index);
    resolve_vertical(body, config, index);

    let floor = config.floor_height + config.player_half_height;
    if body.position.y < floor {
        body.position.y = floor;
        body.velocity.y = 0.0;
        body.grounded = true;
    }
}

fn resolve_horizontal(body: &mut PlayerBody, config: &MovementConfig, index: &dyn CubeIndex) {
    let delta = Vec3::new(body.velocity.x, 0.0, body.velocity.z);
    if delta == Vec3::ZERO {
        return;
    }
    let vy = body.velocity.y;

    let full = body.position + delta;
    if !side_blocked(full, vy, config, index) {
        body.position = full;
        return;
    }

    let x_only = body.position + Vec3::new(delta.x, 0.0, 0.0);
    if delta.x != 0.0 && !side_blocked(x_only, vy, config, index) {
        body.position = x_only;
    } else {
        body.velocity.x = 0.0;
    }

    let z_only = body.position + Vec3::new(0.0, 0.0, delta.z);
    if delta.z != 0.0 && !side_blocked(z_only, vy, config, index) {
        body.position = z_only;
    } else {
        body.velocity.z = 0.0;
    }
    trace!(position = ?body.position, "Horizontal move blocked, sliding");
}

fn resolve_vertical(body: &mut PlayerBody, config: &MovementConfig, index: &dyn CubeIndex) {
    let vy = body.velocity.y;
    let candidate = body.position + Vec3::Y * vy;
    let bottom_before = body.position.y - config.player_half_height;

    // Sweep the whole vertical span so a fast fall cannot tunnel through a top.
    let swept = body_box(body.position, config).union(&body_box(candidate, config));
    let hits = index.query_aabb(&swept);

    body.grounded = false;

    if vy <= 0.0 {
        let support = hits
            .iter()
            .map(|cube| cube.aabb.max.y)
            .filter(|top| bottom_before >= top - config.landing_tolerance)
            .fold(None, |best: Option<f32>, top| Some(best.map_or(top, |b| b.max(top))));
        if let Some(top) = support {
            if candidate.y - config.player_half_height <= top {
                body.position.y = top + config.player_half_height;
                body.velocity.y = 0.0;
                body.grounded = true;
                return;
            }
        }
    } else if !hits.is_empty() {
        let head = body.position.y + config.player_half_height - config.landing_tolerance;
        let ceiling_hit = index
            .query_aabb(&body_box(candidate, config))
            .iter()
            .any(|cube| cube.aabb.min.y >= head);
        if ceiling_hit {
            body.velocity.y = 0.0;
            return;
        }
    }

    body.position.y = candidate.y;
}

#[cfg(test)]
mod tests {
    use quarry_world::{Cube, CubeId, CubeType};

    use super::*;
    use crate::index::LinearIndex;

    fn config() -> MovementConfig {
        MovementConfig::default()
    }

    fn floor_of(cubes: &mut Vec<Cube>, size: i32) {
        let mut id = cubes.len() as u32 + 1;
        for x in -size..=size {
            for z in -size..=size {
                let position = Vec3::new(x as f32, 0.5, z as f32);
                cubes.push(Cube::new(CubeId(id), position, CubeType::Stone));
                id += 1;
            }
        }
    }

    fn standing(config: &MovementConfig) -> PlayerBody {
        let mut body = PlayerBody::new(Vec3::new(0.0, 1.0 + config.player_half_height, 0.0));
        body.grounded = true;
        body
    }

    #[test]
    fn test_diagonal_input_is_normalized() {
        let input = MovementInput {
            forward: true,
            right: true,
            ..Default::default()
        };
        assert!((input.direction().length() - 1.0).abs() < 1e-6);

        let opposed = MovementInput {
            forward: true,
            back: true,
            ..Default::default()
        };
        assert_eq!(opposed.direction(), glam::Vec2::ZERO);
    }

    #[test]
    fn test_velocity_smooths_toward_target() {
        let config = config();
        let index = LinearIndex::default();
        let mut body = PlayerBody::new(Vec3::new(0.0, config.player_half_height, 0.0));
        let input = MovementInput {
            forward: true,
            ..Default::default()
        };
        step_player(&mut body, &input, 0.0, &config, &index);
        assert!((body.velocity.z + config.move_speed * config.smoothing).abs() < 1e-6);
        assert!(body.velocity.x.abs() < 1e-6);
        for _ in 0..100 {
            step_player(&mut body, &input, 0.0, &config, &index);
        }
        assert!((body.horizontal_speed() - config.move_speed).abs() < 1e-3);
    }

    #[test]
    fn test_rests_on_cube_top() {
        let config = config();
        let mut cubes = Vec::new();
        floor_of(&mut cubes, 2);
        let index = LinearIndex::new(&cubes);
        let mut body = standing(&config);
        for _ in 0..30 {
            step_player(&mut body, &MovementInput::default(), 0.0, &config, &index);
            assert!(body.grounded);
            assert!((body.position.y - (1.0 + config.player_half_height)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_falls_and_lands() {
        let config = config();
        let mut cubes = Vec::new();
        floor_of(&mut cubes, 2);
        let index = LinearIndex::new(&cubes);
        let mut body = PlayerBody::new(Vec3::new(0.0, 8.0, 0.0));
        for _ in 0..200 {
            step_player(&mut body, &MovementInput::default(), 0.0, &config, &index);
        }
        assert!(body.grounded);
        assert_eq!(body.velocity.y, 0.0);
        assert!((body.position.y - (1.0 + config.player_half_height)).abs() < 1e-5);
    }

    #[test]
    fn test_world_floor_clamp() {
        let config = config();
        let index = LinearIndex::default();
        let mut body = PlayerBody::new(Vec3::new(0.0, 3.0, 0.0));
        for _ in 0..200 {
            step_player(&mut body, &MovementInput::default(), 0.0, &config, &index);
        }
        assert!(body.grounded);
        assert_eq!(body.position.y, config.floor_height + config.player_half_height);
    }

    #[test]
    fn test_jump_only_when_grounded() {
        let config = config();
        let mut cubes = Vec::new();
        floor_of(&mut cubes, 1);
        let index = LinearIndex::new(&cubes);
        let jump = MovementInput {
            jump: true,
            ..Default::default()
        };

        let mut body = standing(&config);
        step_player(&mut body, &jump, 0.0, &config, &index);
        assert!(!body.grounded);
        assert!(body.velocity.y > 0.0);
        let rising = body.velocity.y;

        step_player(&mut body, &jump, 0.0, &config, &index);
        assert!(body.velocity.y < rising, "no double jump in mid-air");
    }

    #[test]
    fn test_wall_blocks_and_slides() {
        let config = config();
        let mut cubes = Vec::new();
        floor_of(&mut cubes, 8);
        // A wall along x = 2 on the layer above the floor.
        for (i, z) in (-8..=8).enumerate() {
            cubes.push(Cube::new(
                CubeId(1_000 + i as u32),
                Vec3::new(2.0, 1.5, z as f32),
                CubeType::Stone,
            ));
        }
        let index = LinearIndex::new(&cubes);
        let mut body = standing(&config);

        // Yaw -PI/4 faces between +X and -Z.
        let input = MovementInput {
            forward: true,
            ..Default::default()
        };
        let yaw = -std::f32::consts::FRAC_PI_4;
        for _ in 0..60 {
            step_player(&mut body, &input, yaw, &config, &index);
        }
        let wall_face = 2.0 - 0.5 - config.player_half_width;
        assert!(body.position.x <= wall_face + 1e-4, "x = {}", body.position.x);
        assert!(body.position.z < -1.0, "slid along the wall");
        assert!(body.grounded);
    }

    #[test]
    fn test_ceiling_stops_upward_motion() {
        let config = config();
        let mut cubes = Vec::new();
        floor_of(&mut cubes, 1);
        // A roof leaving 0.05 units of headroom.
        let roof_y = 1.0 + config.player_half_height * 2.0 + 0.05 + 0.5;
        cubes.push(Cube::new(CubeId(500), Vec3::new(0.0, roof_y, 0.0), CubeType::Stone));
        let index = LinearIndex::new(&cubes);

        let mut body = standing(&config);
        let start_y = body.position.y;
        step_player(
            &mut body,
            &MovementInput {
                jump: true,
                ..Default::default()
            },
            0.0,
            &config,
            &index,
        );
        assert_eq!(body.velocity.y, 0.0);
        assert_eq!(body.position.y, start_y);
    }
}
