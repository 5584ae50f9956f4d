//! Box-approximation physics for the local player: cube spatial index,
//! per-frame movement with axis-separated collision, and the view raycast.

pub mod index;
pub mod movement;
pub mod raycast;

pub use index::{CubeBox, CubeGrid, CubeIndex, LinearIndex};
pub use movement::{MovementInput, PlayerBody, step_player};
pub use raycast::{RayHit, raycast_cubes};
