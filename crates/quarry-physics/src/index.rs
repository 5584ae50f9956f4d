//! Spatial queries over the active cube set.
//!
//! Movement and raycasting only ask "which cube boxes overlap this region".
//! [`LinearIndex`] answers by scanning; [`CubeGrid`] buckets cubes into unit
//! cells with a reverse index so removals and respawns stay O(1).

use bevy_ecs::prelude::*;
use glam::IVec3;
use quarry_math::Aabb;
use quarry_world::{Cube, CubeId};
use rustc_hash::FxHashMap;

/// A cube's identity and collision box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeBox {
    pub id: CubeId,
    pub aabb: Aabb,
}

impl From<&Cube> for CubeBox {
    fn from(cube: &Cube) -> Self {
        Self {
            id: cube.id,
            aabb: cube.aabb(),
        }
    }
}

/// Box-overlap query used by movement and raycasting.
pub trait CubeIndex {
    /// Returns every cube box that could overlap `region`. Callers run the
    /// exact intersection test themselves.
    fn query_aabb(&self, region: &Aabb) -> Vec<CubeBox>;
}

/// Linear scan over a cube list.
#[derive(Debug, Clone, Default)]
pub struct LinearIndex {
    boxes: Vec<CubeBox>,
}

impl LinearIndex {
    pub fn new<'a>(cubes: impl IntoIterator<Item = &'a Cube>) -> Self {
        Self {
            boxes: cubes.into_iter().map(CubeBox::from).collect(),
        }
    }
}

impl CubeIndex for LinearIndex {
    fn query_aabb(&self, region: &Aabb) -> Vec<CubeBox> {
        self.boxes
            .iter()
            .filter(|b| b.aabb.intersects(region))
            .copied()
            .collect()
    }
}

/// Uniform grid of unit cells keyed by the floor of each cube's center.
#[derive(Resource, Debug, Default)]
pub struct CubeGrid {
    cells: FxHashMap<IVec3, Vec<CubeBox>>,
    /// Reverse index: cube id -> cell, for removal without a scan.
    index: FxHashMap<CubeId, IVec3>,
}

impl CubeGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cubes<'a>(cubes: impl IntoIterator<Item = &'a Cube>) -> Self {
        let mut grid = Self::new();
        grid.rebuild(cubes);
        grid
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: CubeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Inserts a cube, replacing any previous entry with the same id.
    pub fn insert(&mut self, cube: &Cube) {
        self.remove(cube.id);
        let cell = cell_of(cube.position);
        self.cells.entry(cell).or_default().push(CubeBox::from(cube));
        self.index.insert(cube.id, cell);
    }

    /// Removes a cube. Returns `false` if it was not indexed.
    pub fn remove(&mut self, id: CubeId) -> bool {
        let Some(cell) = self.index.remove(&id) else {
            return false;
        };
        if let Some(bucket) = self.cells.get_mut(&cell) {
            bucket.retain(|b| b.id != id);
            if bucket.is_empty() {
                self.cells.remove(&cell);
            }
        }
        true
    }

    pub fn rebuild<'a>(&mut self, cubes: impl IntoIterator<Item = &'a Cube>) {
        self.cells.clear();
        self.index.clear();
        for cube in cubes {
            self.insert(cube);
        }
    }
}

impl CubeIndex for CubeGrid {
    fn query_aabb(&self, region: &Aabb) -> Vec<CubeBox> {
        // A unit cube centered in cell c spans [c - 0.5, c + 1.5), so widen
        // the cell range by one on each side.
        let lo = region.min.floor().as_ivec3() - IVec3::ONE;
        let hi = region.max.floor().as_ivec3() + IVec3::ONE;

        let mut out = Vec::new();
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    if let Some(bucket) = self.cells.get(&IVec3::new(x, y, z)) {
                        out.extend(bucket.iter().filter(|b| b.aabb.intersects(region)).copied());
                    }
                }
            }
        }
        out
    }
}

fn cell_of(position: glam::Vec3) -> IVec3 {
    position.floor().as_ivec3()
}
