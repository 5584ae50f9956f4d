//! Box and angle math shared by the movement, targeting, and reconciliation crates.

mod aabb;
mod angle;

pub use aabb::Aabb;
pub use angle::{lerp_angle, shortest_angle_delta, wrap_angle};
