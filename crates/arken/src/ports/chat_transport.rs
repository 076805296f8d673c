//! Chat Transport Port
//!
//! Abstract interface for delivering a chat-completions request to the
//! companion endpoint. The port only moves bytes; turning the body into a
//! reply is the bridge's job so that malformed payloads can be handled in
//! one place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::value_objects::Speaker;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl From<Speaker> for MessageRole {
    fn from(speaker: Speaker) -> Self {
        match speaker {
            Speaker::Player => MessageRole::User,
            Speaker::Companion => MessageRole::Assistant,
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Conversation turn spoken by `speaker`
    pub fn spoken_by(speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            role: speaker.into(),
            content: content.into(),
        }
    }
}

/// Request body: `{"model": ..., "messages": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Response body; only `choices[0].message.content` is consulted
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub content: String,
}

impl ChatResponse {
    /// Parse a raw body and return the first choice's content
    pub fn first_content(body: &str) -> Result<String, DomainError> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| DomainError::MalformedResponse(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(DomainError::EmptyChoices)
    }
}

/// Companion endpoint transport
///
/// Implementations POST the serialized request and return the raw body of a
/// successful (2xx) response.
///
/// # Example
///
/// ```rust,ignore
/// use arken::ports::ChatTransport;
///
/// struct OllamaTransport { /* reqwest client */ }
///
/// #[async_trait]
/// impl ChatTransport for OllamaTransport {
///     async fn post(&self, request: &ChatRequest) -> Result<String, DomainError> {
///         // POST to http://localhost:11434/v1/chat/completions
///     }
/// }
/// ```
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the request, returning the body of a 2xx response
    async fn post(&self, request: &ChatRequest) -> Result<String, DomainError>;

    /// Endpoint description for logs
    fn endpoint(&self) -> &str;
}
