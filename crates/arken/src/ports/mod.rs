//! Ports (Interfaces)
//!
//! Abstract interfaces that define how the services interact with
//! the engine-side collision body, the companion HTTP endpoint and
//! the input devices.
//!
//! Implementations of these traits live in `adapters/` or in the host.

pub mod character_body;
pub mod chat_transport;
pub mod input_source;

// Re-exports
pub use character_body::*;
pub use chat_transport::*;
pub use input_source::*;
