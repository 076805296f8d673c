//! Input - keyboard state to locomotion input
//!
//! Two sources are available. `ActionBindings` maps named actions to key
//! lists and can be reconfigured; `KeyboardFallback` polls fixed keys (WASD
//! and arrows, Space, LeftShift). `InputRouter` prefers the bindings and
//! drops to the fallback when none are configured.
//!
//! Jump is reported on the press edge only, so holding Space jumps once.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::MoveInput;
use crate::ports::{InputSource, Key, KeyState};

/// Press-edge detector
#[derive(Debug, Clone, Copy, Default)]
struct JumpEdge {
    was_down: bool,
}

impl JumpEdge {
    fn update(&mut self, down: bool) -> bool {
        let edge = down && !self.was_down;
        self.was_down = down;
        edge
    }
}

fn axis_from(up: bool, down: bool, left: bool, right: bool) -> Vec2 {
    let x = f32::from(u8::from(right)) - f32::from(u8::from(left));
    let y = f32::from(u8::from(up)) - f32::from(u8::from(down));
    Vec2::new(x, y).normalize_or_zero()
}

/// Configurable action layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionBindings {
    pub move_up: Vec<Key>,
    pub move_down: Vec<Key>,
    pub move_left: Vec<Key>,
    pub move_right: Vec<Key>,
    pub jump: Vec<Key>,
    pub sprint: Vec<Key>,
}

impl Default for ActionBindings {
    fn default() -> Self {
        Self {
            move_up: vec![Key::W],
            move_down: vec![Key::S],
            move_left: vec![Key::A],
            move_right: vec![Key::D],
            jump: vec![Key::Space],
            sprint: vec![Key::LeftShift],
        }
    }
}

impl ActionBindings {
    /// Bindings with no keys at all
    pub fn unbound() -> Self {
        Self {
            move_up: Vec::new(),
            move_down: Vec::new(),
            move_left: Vec::new(),
            move_right: Vec::new(),
            jump: Vec::new(),
            sprint: Vec::new(),
        }
    }

    /// Whether any movement action has a key
    pub fn is_configured(&self) -> bool {
        [&self.move_up, &self.move_down, &self.move_left, &self.move_right]
            .iter()
            .any(|keys| !keys.is_empty())
    }

    pub fn axis(&self, keys: &KeyState) -> Vec2 {
        axis_from(
            keys.any_pressed(&self.move_up),
            keys.any_pressed(&self.move_down),
            keys.any_pressed(&self.move_left),
            keys.any_pressed(&self.move_right),
        )
    }
}

/// Raw key polling used when no action layer is configured
#[derive(Debug, Clone, Default)]
pub struct KeyboardFallback {
    jump: JumpEdge,
}

impl KeyboardFallback {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSource for KeyboardFallback {
    fn sample(&mut self, keys: &KeyState) -> MoveInput {
        let axis = axis_from(
            keys.any_pressed(&[Key::W, Key::Up]),
            keys.any_pressed(&[Key::S, Key::Down]),
            keys.any_pressed(&[Key::A, Key::Left]),
            keys.any_pressed(&[Key::D, Key::Right]),
        );
        let jump = self.jump.update(keys.is_pressed(Key::Space));
        MoveInput::new(axis, keys.is_pressed(Key::LeftShift), jump)
    }
}

#[derive(Debug, Clone)]
enum Route {
    Bindings {
        bindings: ActionBindings,
        jump: JumpEdge,
    },
    Fallback(KeyboardFallback),
}

/// Chooses between the action layer and raw polling
#[derive(Debug, Clone)]
pub struct InputRouter {
    route: Route,
}

impl InputRouter {
    pub fn new(bindings: Option<ActionBindings>) -> Self {
        let route = match bindings {
            Some(bindings) if bindings.is_configured() => {
                debug!("Using configured action bindings");
                Route::Bindings {
                    bindings,
                    jump: JumpEdge::default(),
                }
            }
            Some(_) => {
                warn!("Action bindings have no movement keys; using keyboard fallback");
                Route::Fallback(KeyboardFallback::new())
            }
            None => {
                debug!("No action bindings; using keyboard fallback");
                Route::Fallback(KeyboardFallback::new())
            }
        };
        Self { route }
    }

    pub fn uses_bindings(&self) -> bool {
        matches!(self.route, Route::Bindings { .. })
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(Some(ActionBindings::default()))
    }
}

impl InputSource for InputRouter {
    fn sample(&mut self, keys: &KeyState) -> MoveInput {
        match &mut self.route {
            Route::Bindings { bindings, jump } => {
                let jumped = jump.update(keys.any_pressed(&bindings.jump));
                MoveInput::new(bindings.axis(keys), keys.any_pressed(&bindings.sprint), jumped)
            }
            Route::Fallback(fallback) => fallback.sample(keys),
        }
    }
}
