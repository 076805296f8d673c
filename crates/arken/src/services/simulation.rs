//! Simulation - headless frame loop
//!
//! Runs one player and its follow camera on flat ground in the order a game
//! engine would: locomotion during the update step, then the camera during
//! the late update, so the camera always chases this frame's pose.

use glam::Vec3;
use tracing::trace;

use crate::adapters::FlatGround;
use crate::domain::{MoveInput, Pose};
use crate::ports::{CharacterBody, InputSource, KeyState};
use crate::services::follow_camera::{CameraConfig, FollowCamera};
use crate::services::locomotion::{FrameMotion, Locomotion, LocomotionConfig, MovementBasis};

/// Result of one simulated frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub motion: FrameMotion,
    pub player: Pose,
    pub camera: Pose,
}

/// Player, ground and camera advanced together
#[derive(Debug, Clone)]
pub struct Simulation {
    locomotion: Locomotion,
    body: FlatGround,
    camera: FollowCamera,
    frame: u64,
    elapsed: f32,
}

impl Simulation {
    /// Spawn the player (at the origin when no spawn point is given) and
    /// snap the camera behind it
    pub fn new(
        locomotion: LocomotionConfig,
        camera: CameraConfig,
        spawn_point: Option<Vec3>,
    ) -> Self {
        let mut body = FlatGround::new(Vec3::ZERO, 0.0);
        let mut locomotion = Locomotion::new(locomotion);
        locomotion.teleport(&mut body, spawn_point);
        let camera = FollowCamera::looking_at(camera, &locomotion.pose(&body));

        Self {
            locomotion,
            body,
            camera,
            frame: 0,
            elapsed: 0.0,
        }
    }

    pub fn player(&self) -> Pose {
        self.locomotion.pose(&self.body)
    }

    pub fn camera(&self) -> Pose {
        self.camera.pose()
    }

    pub fn body(&self) -> &FlatGround {
        &self.body
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advance one frame with already sampled input
    pub fn tick(&mut self, input: &MoveInput, dt: f32) -> FrameReport {
        let basis = MovementBasis::Camera(self.camera.forward());
        let motion = self.locomotion.update(input, basis, &mut self.body, dt);

        let player = self.player();
        self.camera.update(&player, dt);

        self.frame += 1;
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
        trace!(
            frame = self.frame,
            x = player.position.x,
            y = player.position.y,
            z = player.position.z,
            grounded = self.body.is_grounded(),
            "Frame"
        );

        FrameReport {
            frame: self.frame,
            motion,
            player,
            camera: self.camera.pose(),
        }
    }

    /// Sample `source` once and advance one frame
    pub fn step(&mut self, source: &mut dyn InputSource, keys: &KeyState, dt: f32) -> FrameReport {
        let input = source.sample(keys);
        self.tick(&input, dt)
    }
}
