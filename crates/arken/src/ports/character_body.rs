//! Character Body Port
//!
//! The collision-resolving controller that locomotion drives. A body is
//! moved by exactly one combined displacement per frame; splitting the
//! horizontal and vertical parts over two calls would resolve collisions
//! twice.

use glam::Vec3;

/// Result of a single `move_by` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    /// Position after collision resolution
    pub position: Vec3,
    /// Whether the body ended the move resting on a walkable surface
    pub grounded: bool,
}

/// Collision-resolving character body (capsule controller)
pub trait CharacterBody {
    fn position(&self) -> Vec3;

    /// Grounded state as of the last resolved move
    fn is_grounded(&self) -> bool;

    /// Apply a displacement and resolve collisions
    fn move_by(&mut self, displacement: Vec3) -> MoveResult;

    /// Teleport without collision resolution
    fn set_position(&mut self, position: Vec3);
}
