//! In-memory conversation history for a chat session.
use serde::Serialize;

use crate::completion::SenderType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl From<Role> for SenderType {
    fn from(role: Role) -> Self {
        match role {
            Role::User => SenderType::User,
            Role::Assistant => SenderType::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

/// Ordered record of completed user and assistant turns.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, text: &str) {
        self.entries.push(HistoryEntry {
            role,
            text: text.to_string(),
        });
    }

    /// The last `window` entries, or all of them when there are fewer.
    pub fn recent(&self, window: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(window);
        &self.entries[start..]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
