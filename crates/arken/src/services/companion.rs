//! Companion Service - AI companion chat bridge
//!
//! Forwards the player's message, together with the whole conversation so
//! far, to an OpenAI-compatible chat-completions endpoint and records the
//! companion's answer in the session's conversation store.
//!
//! Failures never escape: transport problems and unusable bodies turn into
//! fixed in-character fallback replies. Every request that starts also
//! completes, so UI loading indicators can rely on the start/complete pair.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{DomainError, Speaker};
use crate::ports::{ChatMessage, ChatRequest, ChatResponse, ChatTransport};
use crate::services::conversation_store::SessionContext;

pub const DEFAULT_API_URL: &str = "http://localhost:11434/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistral";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an overly enthusiastic but helpful guide in a mysterious new world. Keep replies playful and a little cringe, but still helpful.";
pub const TRANSPORT_FAILURE_REPLY: &str =
    "I tried to answer but something glitched in the ether. Let's try that again!";
pub const MALFORMED_REPLY: &str = "Uh-oh, my brain fog rolled in. Let's give that another go!";

const EVENT_CAPACITY: usize = 64;

/// Companion endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Chat-completions endpoint
    pub api_url: String,
    /// Model identifier sent in every request
    pub model: String,
    /// Bearer token for hosted APIs; local services need none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Persona instructions sent as the first message
    pub system_prompt: String,
    /// Reply recorded when the endpoint cannot be reached or answers non-2xx
    pub transport_failure_reply: String,
    /// Reply recorded when the body cannot be parsed or has no choices
    pub malformed_reply: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            transport_failure_reply: TRANSPORT_FAILURE_REPLY.to_string(),
            malformed_reply: MALFORMED_REPLY.to_string(),
            timeout_secs: 60,
        }
    }
}

impl CompanionConfig {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// API key if one is set and not blank
    pub fn bearer_token(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Lifecycle notifications for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanionEvent {
    RequestStarted { id: Uuid },
    ReplyReceived { id: Uuid, text: String },
    RequestCompleted { id: Uuid },
}

impl CompanionEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            Self::RequestStarted { id } => *id,
            Self::ReplyReceived { id, .. } => *id,
            Self::RequestCompleted { id } => *id,
        }
    }
}

/// Why a fallback reply was used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Endpoint unreachable, timed out or answered non-2xx
    Transport,
    /// Body was not JSON of the expected shape, or `choices` was empty
    Malformed,
}

/// Result of one companion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Answered(String),
    Fallback { reason: FallbackReason, text: String },
    Cancelled,
}

impl ReplyOutcome {
    /// Text recorded as the companion's reply, if any
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Self::Answered(text) => Some(text),
            Self::Fallback { text, .. } => Some(text),
            Self::Cancelled => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Receiving end of the bridge's event stream
///
/// Dropping the subscription unregisters it. A subscriber that falls more
/// than the channel capacity behind skips ahead; the number of events it
/// missed is kept until [`take_lagged`](Self::take_lagged) is called.
pub struct EventSubscription {
    receiver: broadcast::Receiver<CompanionEvent>,
    lagged: u64,
}

impl EventSubscription {
    pub(crate) fn new(receiver: broadcast::Receiver<CompanionEvent>) -> Self {
        Self {
            receiver,
            lagged: 0,
        }
    }

    /// Events skipped since the last call
    pub fn take_lagged(&mut self) -> u64 {
        std::mem::take(&mut self.lagged)
    }

    /// Wait for the next event; `None` once the bridge is gone
    pub async fn recv(&mut self) -> Option<CompanionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Companion event subscriber lagged");
                    self.lagged += skipped;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already queued
    pub fn try_next(&mut self) -> Option<CompanionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Companion event subscriber lagged");
                    self.lagged += skipped;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// All events queued so far
    pub fn drain(&mut self) -> Vec<CompanionEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

/// Builder for [`CompanionBridge`]
#[derive(Default)]
pub struct CompanionBridgeBuilder {
    config: Option<CompanionConfig>,
    transport: Option<Arc<dyn ChatTransport>>,
    session: Option<SessionContext>,
}

impl CompanionBridgeBuilder {
    pub fn config(mut self, config: CompanionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn transport(mut self, transport: impl ChatTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the bridge; a missing store or transport is reported, not panicked on
    pub fn build(self) -> Result<CompanionBridge, DomainError> {
        let Some(session) = self.session else {
            warn!("Companion bridge requires a conversation store to function");
            return Err(DomainError::missing("conversation store"));
        };
        let Some(transport) = self.transport else {
            warn!("Companion bridge requires a chat transport to function");
            return Err(DomainError::missing("chat transport"));
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(CompanionBridge {
            config: self.config.unwrap_or_default(),
            transport,
            session,
            events,
        })
    }
}

/// Chat bridge between the player and the companion endpoint
pub struct CompanionBridge {
    config: CompanionConfig,
    transport: Arc<dyn ChatTransport>,
    session: SessionContext,
    events: broadcast::Sender<CompanionEvent>,
}

impl CompanionBridge {
    pub fn builder() -> CompanionBridgeBuilder {
        CompanionBridgeBuilder::default()
    }

    pub fn config(&self) -> &CompanionConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Register for request lifecycle events
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription::new(self.events.subscribe())
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<CompanionEvent> {
        self.events.clone()
    }

    /// Send a player message and wait for the companion's reply
    ///
    /// Blank or whitespace-only input is ignored and returns `None`.
    pub async fn send(&self, message: &str) -> Option<ReplyOutcome> {
        self.send_cancellable(message, &CancellationToken::new())
            .await
    }

    /// Like [`send`](Self::send), abandoning the request when `cancel` fires
    pub async fn send_cancellable(
        &self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Option<ReplyOutcome> {
        self.send_with_id(Uuid::new_v4(), message, cancel).await
    }

    pub(crate) async fn send_with_id(
        &self,
        id: Uuid,
        message: &str,
        cancel: &CancellationToken,
    ) -> Option<ReplyOutcome> {
        if message.trim().is_empty() {
            debug!("Ignoring blank companion message");
            return None;
        }

        // Cancelled while still queued: nothing is recorded
        if cancel.is_cancelled() {
            info!(request_id = %id, "Companion request cancelled before it was sent");
            self.emit(CompanionEvent::RequestStarted { id });
            self.emit(CompanionEvent::RequestCompleted { id });
            return Some(ReplyOutcome::Cancelled);
        }

        self.session.append(Speaker::Player, message);
        self.emit(CompanionEvent::RequestStarted { id });

        let request = self.build_request();
        debug!(
            request_id = %id,
            endpoint = %self.transport.endpoint(),
            messages = request.messages.len(),
            "Sending companion request"
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.transport.post(&request) => Some(result),
        };

        let outcome = match result {
            Some(result) => self.resolve(id, result),
            None => {
                info!(request_id = %id, "Companion request cancelled");
                ReplyOutcome::Cancelled
            }
        };

        if let Some(text) = outcome.reply_text() {
            self.session.append(Speaker::Companion, text);
            self.emit(CompanionEvent::ReplyReceived {
                id,
                text: text.to_string(),
            });
        }

        self.emit(CompanionEvent::RequestCompleted { id });
        Some(outcome)
    }

    /// System prompt followed by the full history mapped to chat roles
    pub fn build_request(&self) -> ChatRequest {
        let history = self.session.read();
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(&self.config.system_prompt));
        messages.extend(
            history
                .entries()
                .iter()
                .map(|entry| ChatMessage::spoken_by(entry.speaker(), entry.message())),
        );

        ChatRequest {
            model: self.config.model.clone(),
            messages,
        }
    }

    fn resolve(&self, id: Uuid, result: Result<String, DomainError>) -> ReplyOutcome {
        match result.and_then(|body| ChatResponse::first_content(&body)) {
            Ok(content) => {
                debug!(request_id = %id, reply_len = content.len(), "Companion replied");
                ReplyOutcome::Answered(content)
            }
            Err(e) if e.is_malformed() => {
                error!(request_id = %id, error = %e, "Failed to parse companion response");
                ReplyOutcome::Fallback {
                    reason: FallbackReason::Malformed,
                    text: self.config.malformed_reply.clone(),
                }
            }
            Err(e) => {
                error!(request_id = %id, error = %e, "Companion request failed");
                ReplyOutcome::Fallback {
                    reason: FallbackReason::Transport,
                    text: self.config.transport_failure_reply.clone(),
                }
            }
        }
    }

    fn emit(&self, event: CompanionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::ports::MessageRole;

    #[derive(Clone)]
    pub(crate) enum StubReply {
        Body(String),
        Status(u16),
        Refused,
        Echo,
        Hang,
    }

    pub(crate) struct StubTransport {
        reply: StubReply,
        pub(crate) requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl StubTransport {
        pub(crate) fn new(reply: StubReply) -> Self {
            Self {
                reply,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn body(content: &str) -> Self {
            Self::new(StubReply::Body(choice_body(content)))
        }
    }

    pub(crate) fn choice_body(content: &str) -> String {
        serde_json::json!({"choices": [{"message": {"content": content}}]}).to_string()
    }

    #[async_trait]
    impl ChatTransport for StubTransport {
        async fn post(&self, request: &ChatRequest) -> Result<String, DomainError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                StubReply::Body(body) => Ok(body.clone()),
                StubReply::Status(status) => Err(DomainError::Http {
                    status: *status,
                    body: "upstream unavailable".to_string(),
                }),
                StubReply::Refused => Err(DomainError::Transport("connection refused".into())),
                StubReply::Echo => {
                    let last = request.messages.last().map(|m| m.content.clone());
                    Ok(choice_body(&format!("echo: {}", last.unwrap_or_default())))
                }
                StubReply::Hang => std::future::pending().await,
            }
        }

        fn endpoint(&self) -> &str {
            "stub://companion"
        }
    }

    fn bridge(transport: StubTransport) -> CompanionBridge {
        CompanionBridge::builder()
            .transport(transport)
            .session(SessionContext::new())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let bridge = bridge(StubTransport::body("never"));
        let mut events = bridge.subscribe();

        assert!(bridge.send("").await.is_none());
        assert!(bridge.send("   ").await.is_none());
        assert!(bridge.send("\n\t").await.is_none());

        assert!(bridge.session().is_empty());
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn test_successful_reply_is_recorded() {
        let bridge = bridge(StubTransport::body("hi"));
        let mut events = bridge.subscribe();

        let outcome = bridge.send("hello there").await.unwrap();
        assert_eq!(outcome, ReplyOutcome::Answered("hi".to_string()));

        let last = bridge.session().last().unwrap();
        assert_eq!(last.speaker(), Speaker::Companion);
        assert_eq!(last.message(), "hi");
        assert_eq!(
            bridge.session().render(),
            "Player: hello there\nCompanion: hi"
        );

        let events = events.drain();
        let id = events[0].request_id();
        assert_eq!(
            events,
            vec![
                CompanionEvent::RequestStarted { id },
                CompanionEvent::ReplyReceived {
                    id,
                    text: "hi".to_string()
                },
                CompanionEvent::RequestCompleted { id },
            ]
        );
    }

    #[tokio::test]
    async fn test_request_carries_system_prompt_and_history() {
        let transport = StubTransport::body("sure!");
        let requests = transport.requests.clone();
        let bridge = CompanionBridge::builder()
            .config(CompanionConfig::new("http://example.invalid", "gpt-4o").with_system_prompt("guide"))
            .transport(transport)
            .session(SessionContext::new())
            .build()
            .unwrap();

        bridge.send("first").await;
        bridge.send("second").await;

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let second = &requests[1];
        assert_eq!(second.model, "gpt-4o");
        let roles: Vec<MessageRole> = second.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(second.messages[0].content, "guide");
        assert_eq!(second.messages[3].content, "second");
    }

    #[tokio::test]
    async fn test_transport_failure_uses_fallback() {
        for reply in [StubReply::Refused, StubReply::Status(502)] {
            let bridge = bridge(StubTransport::new(reply));
            let mut events = bridge.subscribe();

            let outcome = bridge.send("are you there?").await.unwrap();
            assert_eq!(
                outcome,
                ReplyOutcome::Fallback {
                    reason: FallbackReason::Transport,
                    text: TRANSPORT_FAILURE_REPLY.to_string()
                }
            );
            assert_eq!(
                bridge.session().last().unwrap().message(),
                TRANSPORT_FAILURE_REPLY
            );

            let events = events.drain();
            assert!(matches!(events.first(), Some(CompanionEvent::RequestStarted { .. })));
            assert!(matches!(events.last(), Some(CompanionEvent::RequestCompleted { .. })));
        }
    }

    #[tokio::test]
    async fn test_malformed_body_uses_distinct_fallback() {
        for body in ["not json", r#"{"choices":[]}"#, r#"{"message":"hi"}"#] {
            let bridge = bridge(StubTransport::new(StubReply::Body(body.to_string())));
            let mut events = bridge.subscribe();

            let outcome = bridge.send("hello").await.unwrap();
            assert_eq!(
                outcome,
                ReplyOutcome::Fallback {
                    reason: FallbackReason::Malformed,
                    text: MALFORMED_REPLY.to_string()
                }
            );
            let last = bridge.session().last().unwrap();
            assert_eq!(last.speaker(), Speaker::Companion);
            assert_eq!(last.message(), MALFORMED_REPLY);
            assert!(matches!(
                events.drain().last(),
                Some(CompanionEvent::RequestCompleted { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_cancel_still_completes() {
        let bridge = Arc::new(bridge(StubTransport::new(StubReply::Hang)));
        let mut events = bridge.subscribe();
        let cancel = CancellationToken::new();

        let task = {
            let bridge = bridge.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { bridge.send_cancellable("wait for me", &cancel).await })
        };

        assert!(matches!(
            events.recv().await,
            Some(CompanionEvent::RequestStarted { .. })
        ));
        cancel.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, ReplyOutcome::Cancelled);
        assert_eq!(bridge.session().len(), 1);
        assert_eq!(bridge.session().last().unwrap().speaker(), Speaker::Player);
        assert!(matches!(
            events.recv().await,
            Some(CompanionEvent::RequestCompleted { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_send_records_nothing() {
        let transport = StubTransport::body("too late");
        let requests = transport.requests.clone();
        let bridge = bridge(transport);
        let mut events = bridge.subscribe();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = bridge.send_cancellable("never mind", &cancel).await;
        assert_eq!(outcome, Some(ReplyOutcome::Cancelled));
        assert!(bridge.session().is_empty());
        assert!(requests.lock().unwrap().is_empty());

        let events = events.drain();
        let id = events[0].request_id();
        assert_eq!(
            events,
            vec![
                CompanionEvent::RequestStarted { id },
                CompanionEvent::RequestCompleted { id },
            ]
        );
    }

    #[tokio::test]
    async fn test_lagging_subscriber_counts_skipped_events() {
        let bridge = bridge(StubTransport::new(StubReply::Echo));
        let mut events = bridge.subscribe();

        for i in 0..30 {
            bridge.send(&format!("message {i}")).await;
        }

        // 30 requests emit 90 events into a 64 slot channel
        assert_eq!(events.drain().len(), EVENT_CAPACITY);
        assert_eq!(events.take_lagged(), 90 - EVENT_CAPACITY as u64);
        assert_eq!(events.take_lagged(), 0);
    }

    #[test]
    fn test_builder_requires_session() {
        let result = CompanionBridge::builder()
            .transport(StubTransport::body("hi"))
            .build();
        assert!(matches!(result, Err(DomainError::MissingCollaborator(_))));

        let result = CompanionBridge::builder()
            .session(SessionContext::new())
            .build();
        assert!(matches!(result, Err(DomainError::MissingCollaborator(_))));
    }

    #[test]
    fn test_bearer_token_ignores_blank_key() {
        assert_eq!(CompanionConfig::default().bearer_token(), None);
        assert_eq!(
            CompanionConfig::default().with_api_key("  ").bearer_token(),
            None
        );
        assert_eq!(
            CompanionConfig::default().with_api_key("sk-123").bearer_token(),
            Some("sk-123")
        );
    }
}
