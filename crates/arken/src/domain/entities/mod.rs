//! Domain Entities
//!
//! - ConversationEntry: one line of the player/companion exchange
//! - Pose: position + orientation of a scene entity

mod conversation_entry;
mod pose;

pub use conversation_entry::*;
pub use pose::*;
