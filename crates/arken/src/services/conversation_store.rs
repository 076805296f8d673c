//! Conversation Store - chronological player/companion log
//!
//! Append-only for the lifetime of a session. There is no eviction, so the
//! log grows without bound until `clear()` is called.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::{ConversationEntry, Speaker};

/// Ordered, append-only conversation log
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    entries: Vec<ConversationEntry>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the end of the log
    pub fn append(&mut self, speaker: Speaker, message: impl Into<String>) {
        self.entries.push(ConversationEntry::new(speaker, message));
    }

    /// Newline-joined `"Speaker: message"` transcript in insertion order
    ///
    /// Messages are not escaped: an entry whose message spans several lines
    /// contributes all of them, so the result can have more lines than the
    /// store has entries.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(ConversationEntry::transcript_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Session-scoped handle to the conversation store
///
/// Owned by the application root and cloned into the bridge and the chat
/// panel. Guards are never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    store: Arc<RwLock<ConversationStore>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    // Every write is a single push or clear, so a poisoned lock still holds a valid log.
    pub fn read(&self) -> RwLockReadGuard<'_, ConversationStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ConversationStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, speaker: Speaker, message: impl Into<String>) {
        self.write().append(speaker, message);
    }

    pub fn render(&self) -> String {
        self.read().render()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Clone of the most recent entry
    pub fn last(&self) -> Option<ConversationEntry> {
        self.read().last().cloned()
    }

    /// Clone of the full log
    pub fn snapshot(&self) -> Vec<ConversationEntry> {
        self.read().entries().to_vec()
    }
}
