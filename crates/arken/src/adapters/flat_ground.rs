//! Flat-ground character body
//!
//! Minimal collision world for the frame-loop simulation and tests: the
//! capsule stands on the plane `y = ground_height` and cannot sink below it.

use glam::Vec3;

use crate::ports::{CharacterBody, MoveResult};

/// Character body on an infinite horizontal plane
#[derive(Debug, Clone)]
pub struct FlatGround {
    position: Vec3,
    ground_height: f32,
    grounded: bool,
    move_count: usize,
}

impl FlatGround {
    pub fn new(position: Vec3, ground_height: f32) -> Self {
        Self {
            position,
            ground_height,
            grounded: position.y <= ground_height,
            move_count: 0,
        }
    }

    /// Number of `move_by` calls so far
    pub fn move_count(&self) -> usize {
        self.move_count
    }
}

impl CharacterBody for FlatGround {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn move_by(&mut self, displacement: Vec3) -> MoveResult {
        self.move_count += 1;

        let mut next = self.position + displacement;
        self.grounded = next.y <= self.ground_height;
        if self.grounded {
            next.y = self.ground_height;
        }
        self.position = next;

        MoveResult {
            position: self.position,
            grounded: self.grounded,
        }
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.grounded = position.y <= self.ground_height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cannot_sink_below_ground() {
        let mut body = FlatGround::new(Vec3::new(0.0, 0.5, 0.0), 0.0);
        assert!(!body.is_grounded());

        let result = body.move_by(Vec3::new(1.0, -3.0, 0.0));
        assert!(result.grounded);
        assert_eq!(result.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(body.move_count(), 1);
    }

    #[test]
    fn test_leaving_ground() {
        let mut body = FlatGround::new(Vec3::ZERO, 0.0);
        assert!(body.is_grounded());
        let result = body.move_by(Vec3::new(0.0, 0.2, 0.0));
        assert!(!result.grounded);
    }
}
