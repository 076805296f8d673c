//! Follow Camera - damped third-person camera
//!
//! Each display frame (after locomotion has moved the target) the camera
//! computes where it would ideally sit, behind and above the target along
//! the target's horizontal heading, and approaches that pose exponentially.
//! The approach uses `1 - e^(-rate * dt)`, so the camera converges at the
//! same speed whatever the frame rate.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::Pose;
use crate::math::{damping_factor, flatten_horizontal, is_finite_quat, is_finite_vec3, look_rotation};

/// Camera framing and smoothing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Horizontal distance behind the target
    pub follow_distance: f32,
    /// Height above the target
    pub height_offset: f32,
    /// Height above the target's origin the camera looks at
    pub look_height: f32,
    /// Exponential rate of the position approach (1/s)
    pub position_damping: f32,
    /// Exponential rate of the rotation approach (1/s)
    pub rotation_damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_distance: 5.5,
            height_offset: 2.0,
            look_height: 1.0,
            position_damping: 8.0,
            rotation_damping: 10.0,
        }
    }
}

/// Third-person follow camera
#[derive(Debug, Clone)]
pub struct FollowCamera {
    config: CameraConfig,
    pose: Pose,
}

impl FollowCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            pose: Pose::default(),
        }
    }

    /// Camera starting at the ideal pose for `target`
    pub fn looking_at(config: CameraConfig, target: &Pose) -> Self {
        let mut camera = Self::new(config);
        camera.snap_to(target);
        camera
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn forward(&self) -> Vec3 {
        self.pose.forward()
    }

    /// Ideal camera position for `target`
    pub fn desired_position(&self, target: &Pose) -> Vec3 {
        let heading = flatten_horizontal(target.forward()).unwrap_or_else(|| {
            trace!("Target faces vertically; using default heading");
            Vec3::Z
        });
        target.position - heading * self.config.follow_distance
            + Vec3::Y * self.config.height_offset
    }

    fn look_point(&self, target: &Pose) -> Vec3 {
        target.position + Vec3::Y * self.config.look_height
    }

    /// Orientation looking from `from` at the point above `target`
    pub fn desired_rotation(&self, from: Vec3, target: &Pose) -> Option<Quat> {
        look_rotation(self.look_point(target) - from, Vec3::Y)
    }

    /// Advance one frame. `dt` below zero is treated as zero.
    pub fn update(&mut self, target: &Pose, dt: f32) {
        if !is_finite_vec3(target.position) || !is_finite_quat(target.rotation) {
            debug!("Ignoring non-finite camera target");
            return;
        }
        if !(dt > 0.0) {
            return;
        }

        let desired = self.desired_position(target);
        let t = damping_factor(self.config.position_damping, dt);
        let position = self.pose.position.lerp(desired, t);
        if is_finite_vec3(position) {
            self.pose.position = position;
        } else {
            debug!("Discarding non-finite camera position");
        }

        // Aim from the new position, not last frame's
        if let Some(desired_rotation) = self.desired_rotation(self.pose.position, target) {
            let r = damping_factor(self.config.rotation_damping, dt);
            let rotation = self.pose.rotation.slerp(desired_rotation, r);
            if is_finite_quat(rotation) {
                self.pose.rotation = rotation.normalize();
            } else {
                debug!("Discarding non-finite camera rotation");
            }
        }
    }

    /// Jump straight to the ideal pose (spawn, teleport)
    pub fn snap_to(&mut self, target: &Pose) {
        let desired = self.desired_position(target);
        if !is_finite_vec3(desired) {
            return;
        }
        self.pose.position = desired;
        if let Some(rotation) = self.desired_rotation(desired, target) {
            self.pose.rotation = rotation;
        }
    }
}
