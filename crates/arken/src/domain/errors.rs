//! Domain Errors
//!
//! Error types for domain operations.

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Response contained no choices")]
    EmptyChoices,

    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl DomainError {
    pub fn missing<T: AsRef<str>>(collaborator: T) -> Self {
        Self::MissingCollaborator(collaborator.as_ref().to_string())
    }

    /// Whether the endpoint answered but the body was unusable
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse(_) | Self::EmptyChoices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(DomainError::EmptyChoices.is_malformed());
        assert!(DomainError::MalformedResponse("eof".into()).is_malformed());
        assert!(!DomainError::Transport("refused".into()).is_malformed());
        assert!(!DomainError::Http {
            status: 503,
            body: String::new()
        }
        .is_malformed());
    }

    #[test]
    fn test_http_error_message() {
        let err = DomainError::Http {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error (401): unauthorized");
    }
}
