//! Per-user conversation state.

use crate::memory::ConversationMemory;

/// One user's conversation: its memory and the collection it is asking about.
///
/// Sessions never share state. The server keeps one per session id and
/// serializes questions within a session.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    memory: ConversationMemory,
    collection: Option<String>,
}

impl Session {
    pub fn new(id: impl Into<String>, max_turns: usize) -> Self {
        Self {
            id: id.into(),
            memory: ConversationMemory::new(max_turns),
            collection: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ConversationMemory {
        &mut self.memory
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Point the session at a collection.
    ///
    /// Switching to a different document clears the transcript, since
    /// follow-ups about the previous file would be rewritten against the
    /// wrong context. Re-activating the current collection keeps it.
    pub fn activate(&mut self, key: &str) {
        if self.collection.as_deref() != Some(key) {
            self.memory.clear();
            self.collection = Some(key.to_string());
        }
    }
}
