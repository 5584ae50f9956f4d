//! Cube identity, material types, and reward table.

use std::fmt;

use glam::Vec3;
use quarry_math::Aabb;
use serde::{Deserialize, Serialize};

/// Session-stable cube identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CubeId(pub u32);

impl fmt::Display for CubeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cube#{}", self.0)
    }
}

/// Cube material. Determines reward and durability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeType {
    Grass,
    Dirt,
    Stone,
    Coal,
    Iron,
    Gold,
    Diamond,
}

impl CubeType {
    /// Tokens credited when a cube of this type is mined.
    pub const fn reward(self) -> u64 {
        match self {
            CubeType::Grass => 500,
            CubeType::Dirt => 500,
            CubeType::Stone => 1_000,
            CubeType::Coal => 2_000,
            CubeType::Iron => 5_000,
            CubeType::Gold => 10_000,
            CubeType::Diamond => 50_000,
        }
    }

    pub const fn max_health(self) -> u32 {
        match self {
            CubeType::Grass | CubeType::Dirt => 60,
            CubeType::Stone | CubeType::Coal => 100,
            CubeType::Iron => 150,
            CubeType::Gold => 200,
            CubeType::Diamond => 300,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            CubeType::Grass => "grass",
            CubeType::Dirt => "dirt",
            CubeType::Stone => "stone",
            CubeType::Coal => "coal",
            CubeType::Iron => "iron",
            CubeType::Gold => "gold",
            CubeType::Diamond => "diamond",
        }
    }
}

/// A destructible unit of the world. `position` is the cube center; every
/// cube spans one world unit on each axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    pub id: CubeId,
    pub position: Vec3,
    pub cube_type: CubeType,
    pub health: u32,
    pub max_health: u32,
    /// Set only while the cube sits in the destroyed set.
    pub respawn_at: Option<u64>,
}

impl Cube {
    pub fn new(id: CubeId, position: Vec3, cube_type: CubeType) -> Self {
        let max_health = cube_type.max_health();
        Self {
            id,
            position,
            cube_type,
            health: max_health,
            max_health,
            respawn_at: None,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::unit_cube(self.position)
    }

    /// Y coordinate of the top face.
    pub fn top(&self) -> f32 {
        self.position.y + 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stone_reward() {
        assert_eq!(CubeType::Stone.reward(), 1_000);
    }

    #[test]
    fn test_new_cube_is_full_health() {
        let cube = Cube::new(CubeId(3), Vec3::new(1.0, 0.5, 2.0), CubeType::Iron);
        assert_eq!(cube.health, cube.max_health);
        assert_eq!(cube.max_health, 150);
        assert!(cube.respawn_at.is_none());
        assert_eq!(cube.top(), 1.0);
    }

    #[test]
    fn test_cube_type_serializes_snake_case() {
        let json = serde_json::to_string(&CubeType::Diamond).unwrap();
        assert_eq!(json, "\"diamond\"");
    }
}
