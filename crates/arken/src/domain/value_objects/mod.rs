//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod move_input;
mod speaker;

pub use move_input::*;
pub use speaker::*;
