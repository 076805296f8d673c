//! Speaker - who said a line of the conversation

use serde::{Deserialize, Serialize};

/// Participant in the player/companion conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Speaker {
    Player,
    Companion,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Player => "Player",
            Speaker::Companion => "Companion",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_uses_variant_names() {
        assert_eq!(serde_json::to_string(&Speaker::Player).unwrap(), r#""Player""#);
        let speaker: Speaker = serde_json::from_str(r#""Companion""#).unwrap();
        assert_eq!(speaker, Speaker::Companion);
    }

    #[test]
    fn test_display() {
        assert_eq!(Speaker::Player.to_string(), "Player");
        assert_eq!(Speaker::Companion.to_string(), "Companion");
    }
}
