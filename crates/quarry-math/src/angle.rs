use std::f32::consts::{PI, TAU};

/// Wraps an angle in radians into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = (angle + PI).rem_euclid(TAU) - PI;
    if a <= -PI {
        a += TAU;
    }
    a
}

/// Signed difference `to - from` along the shortest arc.
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Interpolates from `from` toward `to` by `t` along the shortest arc.
/// The result is wrapped into `(-PI, PI]`.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    wrap_angle(from + shortest_angle_delta(from, to) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_wrap_angle_range() {
        assert!(approx(wrap_angle(0.0), 0.0));
        assert!(approx(wrap_angle(TAU + 0.5), 0.5));
        assert!(approx(wrap_angle(-TAU - 0.5), -0.5));
        assert!(approx(wrap_angle(-PI), PI));
    }

    #[test]
    fn test_shortest_delta_crosses_pi() {
        // 170 degrees to -170 degrees is +20 degrees, not -340.
        let from = 170f32.to_radians();
        let to = (-170f32).to_radians();
        assert!(approx(shortest_angle_delta(from, to), 20f32.to_radians()));
        assert!(approx(shortest_angle_delta(to, from), (-20f32).to_radians()));
    }

    #[test]
    fn test_lerp_angle_takes_short_path() {
        let from = 3.0;
        let to = -3.0;
        let mid = lerp_angle(from, to, 0.5);
        // Halfway along the short arc sits at +/-PI, not at 0.
        assert!(mid.abs() > 3.1, "mid = {mid}");
    }

    #[test]
    fn test_lerp_angle_endpoints() {
        assert!(approx(lerp_angle(0.2, 1.0, 0.0), 0.2));
        assert!(approx(lerp_angle(0.2, 1.0, 1.0), 1.0));
    }
}
