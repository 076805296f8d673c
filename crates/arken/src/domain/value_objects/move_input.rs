//! MoveInput - one frame of locomotion input

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Directional input sampled once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveInput {
    /// Local input, x = strafe (right positive), y = forward. Each component in [-1, 1].
    pub axis: Vec2,
    /// Sprint held
    pub sprint: bool,
    /// Jump pressed this frame (edge, not level)
    pub jump: bool,
}

impl MoveInput {
    /// Build an input, clamping the axis into [-1, 1]^2 and zeroing non-finite components
    pub fn new(axis: Vec2, sprint: bool, jump: bool) -> Self {
        let sanitize = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            axis: Vec2::new(sanitize(axis.x), sanitize(axis.y)),
            sprint,
            jump,
        }
    }

    pub fn forward() -> Self {
        Self::new(Vec2::Y, false, false)
    }

    pub fn with_sprint(mut self, sprint: bool) -> Self {
        self.sprint = sprint;
        self
    }

    pub fn with_jump(mut self, jump: bool) -> Self {
        self.jump = jump;
        self
    }

    /// Length of the axis, capped at 1
    pub fn magnitude(&self) -> f32 {
        self.axis.length().min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_is_clamped() {
        let input = MoveInput::new(Vec2::new(3.0, -7.5), false, false);
        assert_eq!(input.axis, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_non_finite_axis_is_zeroed() {
        let input = MoveInput::new(Vec2::new(f32::NAN, f32::INFINITY), false, false);
        assert_eq!(input.axis, Vec2::ZERO);
    }

    #[test]
    fn test_diagonal_magnitude_caps_at_one() {
        let input = MoveInput::new(Vec2::new(1.0, 1.0), false, false);
        assert!((input.magnitude() - 1.0).abs() < 1e-6);
    }
}
