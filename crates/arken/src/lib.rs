//! Arken Core Library
//!
//! Gameplay and companion-chat core for the Arkenia third-person prototype.
//!
//! # Architecture
//!
//! The crate keeps the domain free of infrastructure and talks to the
//! outside world through ports:
//!
//! - **Domain Layer** (`domain/`): entities and value objects
//!   - `entities/`: `ConversationEntry`, `Pose`
//!   - `value_objects/`: `Speaker`, `MoveInput`
//!   - `errors/`: `DomainError`
//!
//! - **Ports** (`ports/`): traits for the collision body, the chat transport
//!   and input sources
//!
//! - **Services** (`services/`): per-frame camera and locomotion updates, the
//!   conversation store, the companion bridge and the chat panel model
//!
//! - **Adapters** (`adapters/`): reqwest transport and the flat-ground body
//!
//! # Usage
//!
//! ```rust,ignore
//! use arken::{CompanionBridge, HttpChatTransport, SessionContext};
//!
//! let session = SessionContext::new();
//! let bridge = CompanionBridge::builder()
//!     .config(config.clone())
//!     .transport(HttpChatTransport::new(&config)?)
//!     .session(session.clone())
//!     .build()?;
//! let (handle, _task) = bridge.start();
//! ```

pub mod adapters;
pub mod domain;
pub mod math;
pub mod ports;
pub mod services;

// Re-export commonly used types
pub use adapters::{FlatGround, HttpChatTransport};
pub use domain::{ConversationEntry, DomainError, MoveInput, Pose, Speaker};
pub use ports::{
    CharacterBody, ChatMessage, ChatRequest, ChatResponse, ChatTransport, InputSource, Key,
    KeyState, MessageRole, MoveResult,
};
pub use services::{
    ActionBindings, BridgeHandle, CameraConfig, ChatLayout, ChatPanel, CompanionBridge,
    CompanionConfig, CompanionEvent, ConversationStore, EventSubscription, FallbackReason,
    FollowCamera, FrameMotion, FrameReport, InputRouter, KeyboardFallback, Locomotion,
    LocomotionConfig, MovementBasis, ReplyOutcome, RequestState, RequestTicket, SessionContext,
    Simulation, THINKING_LINE,
};
pub use tokio_util::sync::CancellationToken;
