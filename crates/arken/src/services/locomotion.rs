//! Locomotion - third-person character movement
//!
//! Turns one frame of directional input into a single displacement for the
//! character body:
//!
//! - input is mapped onto the horizontal plane, relative to the camera when
//!   one is given and to the character's own facing otherwise
//! - speed approaches `move_speed × sprint × |input|` exponentially
//! - facing turns toward the movement direction at a capped rate, ignoring
//!   inputs inside the dead zone
//! - vertical velocity sticks to the ground while grounded, accumulates
//!   gravity while airborne and is set by a jump edge
//!
//! Horizontal and vertical motion are combined and applied with exactly one
//! `CharacterBody::move_by` call per frame.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{MoveInput, Pose};
use crate::math::{damping_factor, flatten_horizontal, look_rotation, rotate_towards};
use crate::ports::CharacterBody;

/// Movement tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Walking speed (m/s)
    pub move_speed: f32,
    /// Multiplier applied while sprinting
    pub sprint_multiplier: f32,
    /// Exponential rate at which speed approaches its target (1/s)
    pub acceleration: f32,
    /// Gravity (m/s², negative is down)
    pub gravity: f32,
    /// Jump apex height (m)
    pub jump_height: f32,
    /// Maximum turn rate (deg/s)
    pub rotation_speed_deg: f32,
    /// Input magnitude below which the character does not turn
    pub rotation_dead_zone: f32,
    /// Downward velocity held while grounded (m/s)
    pub grounded_stick_velocity: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            sprint_multiplier: 1.5,
            acceleration: 10.0,
            gravity: -9.81,
            jump_height: 1.5,
            rotation_speed_deg: 240.0,
            rotation_dead_zone: 0.12,
            grounded_stick_velocity: -2.0,
        }
    }
}

impl LocomotionConfig {
    /// Initial upward velocity that reaches `jump_height`
    pub fn jump_velocity(&self) -> f32 {
        (-2.0 * self.gravity * self.jump_height).max(0.0).sqrt()
    }
}

/// Frame of reference for turning 2D input into a world direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementBasis {
    /// Relative to the character's own facing
    Facing,
    /// Relative to a camera looking along the given forward vector
    Camera(Vec3),
}

/// What happened during one locomotion frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMotion {
    /// Displacement handed to the body
    pub displacement: Vec3,
    /// Horizontal speed after blending
    pub speed: f32,
    /// Vertical velocity after integration
    pub vertical_velocity: f32,
    /// Whether a jump started this frame
    pub jumped: bool,
    /// Grounded state reported by the body after the move
    pub grounded: bool,
}

/// Character locomotion state
#[derive(Debug, Clone)]
pub struct Locomotion {
    config: LocomotionConfig,
    rotation: Quat,
    heading: Vec3,
    current_speed: f32,
    vertical_velocity: f32,
}

impl Locomotion {
    pub fn new(config: LocomotionConfig) -> Self {
        Self {
            config,
            rotation: Quat::IDENTITY,
            heading: Vec3::ZERO,
            current_speed: 0.0,
            vertical_velocity: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation.normalize();
        self
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn speed(&self) -> f32 {
        self.current_speed
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn pose(&self, body: &dyn CharacterBody) -> Pose {
        Pose::new(body.position(), self.rotation)
    }

    /// Advance one frame and move `body` once
    pub fn update(
        &mut self,
        input: &MoveInput,
        basis: MovementBasis,
        body: &mut dyn CharacterBody,
        dt: f32,
    ) -> FrameMotion {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let grounded = body.is_grounded();

        let direction = self.world_direction(input.axis, basis);
        let magnitude = input.magnitude();

        let mut target_speed = self.config.move_speed * magnitude;
        if input.sprint {
            target_speed *= self.config.sprint_multiplier;
        }
        let blend = damping_factor(self.config.acceleration, dt);
        self.current_speed += (target_speed - self.current_speed) * blend;

        if direction != Vec3::ZERO {
            // Keep gliding along the last heading while decelerating
            self.heading = direction;
            if input.axis.length() >= self.config.rotation_dead_zone {
                self.turn_towards(direction, dt);
            }
        }

        let jumped = input.jump && grounded;
        if jumped {
            self.vertical_velocity = self.config.jump_velocity();
            debug!(velocity = self.vertical_velocity, "Jump");
        }
        if grounded && self.vertical_velocity < 0.0 {
            self.vertical_velocity = self.config.grounded_stick_velocity;
        } else {
            self.vertical_velocity += self.config.gravity * dt;
        }

        let velocity = self.heading * self.current_speed + Vec3::Y * self.vertical_velocity;
        let displacement = if velocity.is_finite() {
            velocity * dt
        } else {
            warn!("Discarding non-finite character velocity");
            Vec3::ZERO
        };
        let result = body.move_by(displacement);

        FrameMotion {
            displacement,
            speed: self.current_speed,
            vertical_velocity: self.vertical_velocity,
            jumped,
            grounded: result.grounded,
        }
    }

    /// Place the body at a spawn point, clearing momentum
    ///
    /// Returns `false` (and keeps the current position) when no usable spawn
    /// point is given.
    pub fn teleport(&mut self, body: &mut dyn CharacterBody, spawn_point: Option<Vec3>) -> bool {
        let Some(position) = spawn_point.filter(|p| p.is_finite()) else {
            warn!("Spawn point is not assigned; player starts at current position");
            return false;
        };

        body.set_position(position);
        self.current_speed = 0.0;
        self.vertical_velocity = 0.0;
        self.heading = Vec3::ZERO;
        info!(x = position.x, y = position.y, z = position.z, "Player spawned");
        true
    }

    fn world_direction(&self, axis: Vec2, basis: MovementBasis) -> Vec3 {
        if axis.length_squared() <= f32::EPSILON {
            return Vec3::ZERO;
        }

        let own = || flatten_horizontal(self.forward());
        let forward = match basis {
            MovementBasis::Camera(camera_forward) => {
                flatten_horizontal(camera_forward).or_else(own)
            }
            MovementBasis::Facing => own(),
        }
        .unwrap_or(Vec3::Z);
        let right = Vec3::Y.cross(forward);

        (forward * axis.y + right * axis.x).normalize_or_zero()
    }

    fn turn_towards(&mut self, direction: Vec3, dt: f32) {
        if let Some(target) = look_rotation(direction, Vec3::Y) {
            let step = self.config.rotation_speed_deg * dt;
            self.rotation = rotate_towards(self.rotation, target, step);
        }
    }
}
