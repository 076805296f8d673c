//! Input Source Port
//!
//! Turns the set of currently pressed keys into one frame of locomotion
//! input. The host polls its devices once per frame and hands the
//! resulting `KeyState` to an `InputSource`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::MoveInput;

/// Keys the prototype cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
    Space,
    LeftShift,
    RightShift,
}

/// Keys held down this frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyState {
    pressed: HashSet<Key>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: Key) -> Self {
        self.pressed.insert(key);
        self
    }

    pub fn press(&mut self, key: Key) {
        self.pressed.insert(key);
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn any_pressed(&self, keys: &[Key]) -> bool {
        keys.iter().any(|k| self.is_pressed(*k))
    }
}

impl FromIterator<Key> for KeyState {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self {
            pressed: iter.into_iter().collect(),
        }
    }
}

/// Source of per-frame locomotion input
pub trait InputSource {
    /// Sample this frame's input. Called exactly once per frame so that
    /// edge-triggered actions (jump) are detected correctly.
    fn sample(&mut self, keys: &KeyState) -> MoveInput;
}
