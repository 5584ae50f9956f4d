//! Deterministic procedural layout of the cube field.
//!
//! Column heights come from a Perlin heightmap; ore placement below the
//! surface uses a seeded RNG. The same [`WorldConfig`] always produces the
//! same cubes with the same ids.

use glam::Vec3;
use noise::{NoiseFn, Perlin};
use quarry_config::WorldConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::cube::{Cube, CubeId, CubeType};

/// Horizontal frequency of the heightmap.
const HEIGHT_FREQUENCY: f64 = 0.15;

/// Generates the initial cube set. Ids are assigned sequentially from 1 in
/// x-major, then z, then y order.
pub fn generate_world(config: &WorldConfig) -> Vec<Cube> {
    let perlin = Perlin::new(config.seed as u32);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let max_height = config.max_column_height.max(1);
    let radius = config.radius.max(0);

    let mut cubes = Vec::new();
    let mut next_id = 1u32;

    for x in -radius..=radius {
        for z in -radius..=radius {
            let height = column_height(&perlin, x, z, max_height);
            for y in 0..height {
                let cube_type = layer_type(&mut rng, y, height);
                let center = Vec3::new(x as f32, y as f32 + 0.5, z as f32);
                cubes.push(Cube::new(CubeId(next_id), center, cube_type));
                next_id += 1;
            }
        }
    }

    info!(
        seed = config.seed,
        radius,
        cubes = cubes.len(),
        "World generated"
    );
    cubes
}

fn column_height(perlin: &Perlin, x: i32, z: i32, max_height: u32) -> u32 {
    let sample = perlin.get([x as f64 * HEIGHT_FREQUENCY, z as f64 * HEIGHT_FREQUENCY]);
    let normalized = ((sample + 1.0) / 2.0).clamp(0.0, 1.0);
    let height = (normalized * max_height as f64).ceil() as u32;
    height.clamp(1, max_height)
}

fn layer_type(rng: &mut StdRng, y: u32, height: u32) -> CubeType {
    if y + 1 == height {
        return CubeType::Grass;
    }
    if y + 2 == height {
        return CubeType::Dirt;
    }

    let roll: f32 = rng.random();
    match roll {
        r if y == 0 && r < 0.01 => CubeType::Diamond,
        r if r < 0.04 => CubeType::Gold,
        r if r < 0.10 => CubeType::Iron,
        r if r < 0.22 => CubeType::Coal,
        _ => CubeType::Stone,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn config(seed: u64) -> WorldConfig {
        WorldConfig {
            seed,
            radius: 6,
            max_column_height: 4,
        }
    }

    #[test]
    fn test_same_seed_same_world() {
        let a = generate_world(&config(7));
        let b = generate_world(&config(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_column_is_capped_with_grass() {
        let cubes = generate_world(&config(3));
        let mut tops: std::collections::HashMap<(i32, i32), &Cube> = Default::default();
        for cube in &cubes {
            let key = (cube.position.x as i32, cube.position.z as i32);
            let entry = tops.entry(key).or_insert(cube);
            if cube.position.y > entry.position.y {
                *entry = cube;
            }
        }
        assert_eq!(tops.len(), 13 * 13);
        assert!(tops.values().all(|c| c.cube_type == CubeType::Grass));
    }

    #[test]
    fn test_ids_are_unique_and_heights_bounded() {
        let cubes = generate_world(&config(11));
        let ids: HashSet<CubeId> = cubes.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), cubes.len());
        assert!(cubes.iter().all(|c| c.position.y > 0.0 && c.position.y < 4.0));
    }

    #[test]
    fn test_diamond_only_on_bottom_layer() {
        for seed in 0..8 {
            for cube in generate_world(&config(seed)) {
                if cube.cube_type == CubeType::Diamond {
                    assert_eq!(cube.position.y, 0.5);
                }
            }
        }
    }
}
