//! View-ray targeting against the cube index.

use glam::Vec3;
use quarry_math::Aabb;
use quarry_world::CubeId;

use crate::index::CubeIndex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub cube_id: CubeId,
    /// Distance from the ray origin to the entry point.
    pub distance: f32,
    pub point: Vec3,
}

/// Returns the nearest cube intersected by the ray within `reach`.
///
/// `direction` need not be normalized. Ties are broken by the lower id so
/// the result is stable across index implementations.
pub fn raycast_cubes(
    index: &dyn CubeIndex,
    origin: Vec3,
    direction: Vec3,
    reach: f32,
) -> Option<RayHit> {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO || reach <= 0.0 {
        return None;
    }

    let end = origin + dir * reach;
    let region = Aabb::new(origin, end).expand_by(0.01);

    index
        .query_aabb(&region)
        .into_iter()
        .filter_map(|cube| {
            cube.aabb
                .ray_intersection(origin, dir, reach)
                .map(|distance| (cube.id, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(cube_id, distance)| RayHit {
            cube_id,
            distance,
            point: origin + dir * distance,
        })
}
