//! Pose Entity
//!
//! Position and orientation of a scene entity. Local `+Z` is forward,
//! `+Y` is up and `+X` is right.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World-space pose, owned and mutated by a single update routine per frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: rotation.normalize(),
        }
    }

    /// Pose facing `yaw_degrees` clockwise from `+Z` when seen from above
    pub fn from_yaw(position: Vec3, yaw_degrees: f32) -> Self {
        Self::new(position, Quat::from_rotation_y(yaw_degrees.to_radians()))
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Heading in degrees around `+Y`, `+Z` is 0 and `+X` is 90
    pub fn yaw_degrees(&self) -> f32 {
        let f = self.forward();
        f.x.atan2(f.z).to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_basis() {
        let pose = Pose::default();
        assert!(pose.forward().abs_diff_eq(Vec3::Z, 1e-6));
        assert_eq!(pose.yaw_degrees(), 0.0);
    }

    #[test]
    fn test_yaw_ninety_faces_positive_x() {
        let pose = Pose::from_yaw(Vec3::ZERO, 90.0);
        assert!(pose.forward().abs_diff_eq(Vec3::X, 1e-5));
        assert!((pose.yaw_degrees() - 90.0).abs() < 1e-3);
    }
}
