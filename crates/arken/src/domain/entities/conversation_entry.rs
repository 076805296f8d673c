//! ConversationEntry Entity
//!
//! One line of the exchange between the player and the companion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Speaker;

/// A single, immutable conversation line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    speaker: Speaker,
    message: String,
    timestamp: DateTime<Utc>,
}

impl ConversationEntry {
    /// Create a new entry stamped with the current time
    pub fn new(speaker: Speaker, message: impl Into<String>) -> Self {
        Self {
            speaker,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `"Speaker: message"` transcript line
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.speaker, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_line() {
        let entry = ConversationEntry::new(Speaker::Player, "where is the tavern?");
        assert_eq!(entry.transcript_line(), "Player: where is the tavern?");
        assert_eq!(entry.speaker(), Speaker::Player);
    }
}
