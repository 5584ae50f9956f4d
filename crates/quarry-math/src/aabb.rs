use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world units.
///
/// Invariant: `min.x <= max.x`, `min.y <= max.y`, `min.z <= max.z`.
/// The constructor enforces this by sorting components.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from two corners. Components are sorted so that
    /// `min <= max` on every axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB from a center point and half-extents.
    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        let half = half.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Unit cube centred on `center`.
    pub fn unit_cube(center: Vec3) -> Self {
        Self::from_center_half_extents(center, Vec3::splat(0.5))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Returns true if the boxes overlap with positive volume.
    /// Touching faces do not count, so a body resting on a cube top
    /// does not intersect it.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Returns the smallest AABB enclosing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns a new AABB grown by `margin` on each of the six faces.
    pub fn expand_by(&self, margin: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Same box moved by `offset`.
    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Slab test. Returns the entry distance along `direction` if the ray
    /// hits the box within `max_distance`. A ray starting inside the box
    /// hits at distance `0.0`.
    pub fn ray_intersection(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_distance;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let lo = self.min[axis];
            let hi = self.max[axis];

            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_corners() {
        let aabb = Aabb::new(Vec3::new(1.0, -1.0, 3.0), Vec3::new(-1.0, 2.0, 0.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_contains_point_on_edge() {
        let aabb = Aabb::unit_cube(Vec3::ZERO);
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(aabb.contains_point(Vec3::ZERO));
        assert!(!aabb.contains_point(Vec3::new(0.51, 0.0, 0.0)));
    }

    #[test]
    fn test_touching_boxes_do_not_intersect() {
        let a = Aabb::unit_cube(Vec3::ZERO);
        let b = Aabb::unit_cube(Vec3::new(1.0, 0.0, 0.0));
        assert!(!a.intersects(&b));

        let c = Aabb::unit_cube(Vec3::new(0.9, 0.0, 0.0));
        assert!(a.intersects(&c));
    }

    #[test]
    fn test_union_and_expand() {
        let a = Aabb::unit_cube(Vec3::ZERO);
        let b = Aabb::unit_cube(Vec3::new(2.0, 0.0, 0.0));
        let u = a.union(&b);
        assert_eq!(u.min.x, -0.5);
        assert_eq!(u.max.x, 2.5);

        let e = a.expand_by(1.0);
        assert_eq!(e.min, Vec3::splat(-1.5));
        assert_eq!(e.max, Vec3::splat(1.5));
    }

    #[test]
    fn test_ray_hits_front_face() {
        let aabb = Aabb::unit_cube(Vec3::new(0.0, 0.0, -3.0));
        let t = aabb
            .ray_intersection(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 10.0)
            .expect("ray should hit");
        assert!((t - 2.5).abs() < 1e-5, "t = {t}");
    }

    #[test]
    fn test_ray_respects_max_distance() {
        let aabb = Aabb::unit_cube(Vec3::new(0.0, 0.0, -8.0));
        assert!(
            aabb.ray_intersection(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 5.0)
                .is_none()
        );
    }

    #[test]
    fn test_ray_parallel_outside_slab_misses() {
        let aabb = Aabb::unit_cube(Vec3::new(0.0, 2.0, -3.0));
        assert!(
            aabb.ray_intersection(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 10.0)
                .is_none()
        );
    }

    #[test]
    fn test_ray_from_inside_hits_at_zero() {
        let aabb = Aabb::unit_cube(Vec3::ZERO);
        assert_eq!(
            aabb.ray_intersection(Vec3::ZERO, Vec3::X, 5.0),
            Some(0.0)
        );
    }
}
