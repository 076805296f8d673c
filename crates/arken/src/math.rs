//! Frame-update math helpers shared by the camera and locomotion services.
//!
//! Conventions: `+Y` is up and an orientation's local `+Z` is its forward.

use glam::{Mat3, Quat, Vec3};

/// Horizontal components shorter than this are treated as vertical.
pub const HORIZONTAL_EPSILON: f32 = 1e-4;

/// Fraction of the remaining distance to cover this frame for an exponential
/// approach with the given rate: `1 - e^(-rate * dt)`.
///
/// Splitting `dt` into several smaller steps covers the same total fraction,
/// so the approach does not depend on the frame rate.
pub fn damping_factor(rate: f32, dt: f32) -> f32 {
    if !(dt > 0.0) || !dt.is_finite() || !(rate > 0.0) {
        return 0.0;
    }
    if rate.is_infinite() {
        return 1.0;
    }
    (1.0 - (-rate * dt).exp()).clamp(0.0, 1.0)
}

/// Drop the vertical component and normalize. `None` when the vector is
/// (nearly) vertical or non-finite.
pub fn flatten_horizontal(v: Vec3) -> Option<Vec3> {
    let flat = Vec3::new(v.x, 0.0, v.z);
    if !flat.is_finite() || flat.length() < HORIZONTAL_EPSILON {
        return None;
    }
    Some(flat.normalize())
}

/// Orientation whose forward (`+Z`) is `forward` and whose up is as close to
/// `up` as possible.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Option<Quat> {
    let f = forward.try_normalize()?;
    let side = up.cross(f);
    if side.length() < 1e-6 {
        return None;
    }
    let r = side.normalize();
    let u = f.cross(r);
    let q = Quat::from_mat3(&Mat3::from_cols(r, u, f)).normalize();
    is_finite_quat(q).then_some(q)
}

/// Rotate `from` toward `to` by at most `max_degrees`, never overshooting.
pub fn rotate_towards(from: Quat, to: Quat, max_degrees: f32) -> Quat {
    let max_radians = max_degrees.max(0.0).to_radians();
    let angle = from.angle_between(to);
    if !angle.is_finite() || angle <= max_radians || angle < 1e-6 {
        return to;
    }
    from.slerp(to, max_radians / angle).normalize()
}

pub fn is_finite_vec3(v: Vec3) -> bool {
    v.is_finite()
}

pub fn is_finite_quat(q: Quat) -> bool {
    q.is_finite() && q.length_squared() > 1e-12
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damping_factor_bounds() {
        assert_eq!(damping_factor(5.0, 0.0), 0.0);
        assert_eq!(damping_factor(5.0, -1.0), 0.0);
        assert_eq!(damping_factor(5.0, f32::NAN), 0.0);
        assert_eq!(damping_factor(0.0, 1.0), 0.0);
        let f = damping_factor(5.0, 0.1);
        assert!(f > 0.0 && f < 1.0);
    }

    #[test]
    fn test_damping_factor_is_frame_rate_independent() {
        let rate = 6.0;
        let whole = damping_factor(rate, 0.1);
        let half = damping_factor(rate, 0.05);
        // remaining after two half steps == remaining after one full step
        let two_halves = 1.0 - (1.0 - half) * (1.0 - half);
        assert!((whole - two_halves).abs() < 1e-6);
    }

    #[test]
    fn test_flatten_rejects_vertical() {
        assert!(flatten_horizontal(Vec3::Y).is_none());
        assert!(flatten_horizontal(Vec3::new(0.0, -3.0, 0.00001)).is_none());
        let flat = flatten_horizontal(Vec3::new(3.0, 10.0, 4.0)).unwrap();
        assert!(flat.abs_diff_eq(Vec3::new(0.6, 0.0, 0.8), 1e-6));
    }

    #[test]
    fn test_look_rotation_maps_forward() {
        let dir = Vec3::new(1.0, 0.0, 1.0).normalize();
        let q = look_rotation(dir, Vec3::Y).unwrap();
        assert!((q * Vec3::Z).abs_diff_eq(dir, 1e-5));
        assert!((q * Vec3::Y).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_look_rotation_degenerate() {
        assert!(look_rotation(Vec3::ZERO, Vec3::Y).is_none());
        assert!(look_rotation(Vec3::Y, Vec3::Y).is_none());
        assert!(look_rotation(Vec3::new(f32::NAN, 0.0, 1.0), Vec3::Y).is_none());
    }

    #[test]
    fn test_rotate_towards_caps_step() {
        let from = Quat::IDENTITY;
        let to = Quat::from_rotation_y(90f32.to_radians());
        let step = rotate_towards(from, to, 30.0);
        assert!((from.angle_between(step).to_degrees() - 30.0).abs() < 1e-2);

        let done = rotate_towards(from, to, 120.0);
        assert!(done.angle_between(to) < 1e-5);
    }
}
