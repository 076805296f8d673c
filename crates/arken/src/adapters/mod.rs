//! Adapters
//!
//! Concrete implementations of the ports:
//! - `HttpChatTransport`: reqwest client for the companion endpoint
//! - `FlatGround`: character body resting on an infinite horizontal plane

mod flat_ground;
mod http_transport;

pub use flat_ground::*;
pub use http_transport::*;
