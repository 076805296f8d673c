pub mod chat_panel;
pub mod companion;
pub mod companion_worker;
pub mod conversation_store;
pub mod follow_camera;
pub mod input;
pub mod layout;
pub mod locomotion;
pub mod simulation;

// Re-exports
pub use chat_panel::{ChatPanel, ScrollView, THINKING_LINE};
pub use companion::{
    CompanionBridge, CompanionBridgeBuilder, CompanionConfig, CompanionEvent, EventSubscription,
    FallbackReason, ReplyOutcome, DEFAULT_API_URL, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
    MALFORMED_REPLY, TRANSPORT_FAILURE_REPLY,
};
pub use companion_worker::{BridgeHandle, RequestState, RequestTicket};
pub use conversation_store::{ConversationStore, SessionContext};
pub use follow_camera::{CameraConfig, FollowCamera};
pub use input::{ActionBindings, InputRouter, KeyboardFallback};
pub use layout::{ChatLayout, Rect};
pub use locomotion::{FrameMotion, Locomotion, LocomotionConfig, MovementBasis};
pub use simulation::{FrameReport, Simulation};
