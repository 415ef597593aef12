//! Client-local conversation history, keyed by assistant id.
//!
//! Mirrors what the chat view needs to resume a conversation: at most
//! `MAX_CONVERSATIONS` assistants are retained, each capped at
//! `MAX_MESSAGES_PER_CONVERSATION` messages. When a cap is exceeded the
//! oldest messages are dropped first, and the conversations with the oldest
//! `last_update` are evicted first.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const MAX_CONVERSATIONS: usize = 5;
pub const MAX_MESSAGES_PER_CONVERSATION: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub text: String,
    pub is_user: bool,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub assistant_name: String,
    /// Unix timestamp in milliseconds of the last append.
    pub last_update: i64,
    pub messages: Vec<StoredMessage>,
}

/// Summary row for the "recent conversations" listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub name: String,
    pub last_update: i64,
    pub message_count: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MessageHistory {
    conversations: HashMap<String, Conversation>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to an assistant's conversation, applying both caps.
    pub fn record(&mut self, assistant_id: &str, assistant_name: &str, text: &str, is_user: bool) {
        self.record_at(
            assistant_id,
            assistant_name,
            text,
            is_user,
            Utc::now().timestamp_millis(),
        );
    }

    fn record_at(
        &mut self,
        assistant_id: &str,
        assistant_name: &str,
        text: &str,
        is_user: bool,
        now_ms: i64,
    ) {
        let entry = self
            .conversations
            .entry(assistant_id.to_string())
            .or_insert_with(|| Conversation {
                assistant_name: assistant_name.to_string(),
                last_update: now_ms,
                messages: Vec::new(),
            });

        entry.messages.push(StoredMessage {
            text: text.to_string(),
            is_user,
            timestamp: now_ms,
        });

        // Oldest messages drop first when the per-conversation cap overflows.
        if entry.messages.len() > MAX_MESSAGES_PER_CONVERSATION {
            let excess = entry.messages.len() - MAX_MESSAGES_PER_CONVERSATION;
            entry.messages.drain(..excess);
        }

        entry.last_update = now_ms;

        self.evict_oldest();
    }

    /// Drop conversations beyond `MAX_CONVERSATIONS`, stalest first.
    fn evict_oldest(&mut self) {
        if self.conversations.len() <= MAX_CONVERSATIONS {
            return;
        }

        let mut by_age: Vec<(String, i64)> = self
            .conversations
            .iter()
            .map(|(id, conv)| (id.clone(), conv.last_update))
            .collect();
        by_age.sort_by(|a, b| b.1.cmp(&a.1));

        for (id, _) in by_age.into_iter().skip(MAX_CONVERSATIONS) {
            debug!(assistant_id = %id, "evicting stale conversation");
            self.conversations.remove(&id);
        }
    }

    pub fn messages_for(&self, assistant_id: &str) -> &[StoredMessage] {
        self.conversations
            .get(assistant_id)
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_conversation(&self, assistant_id: &str) -> bool {
        self.conversations
            .get(assistant_id)
            .is_some_and(|c| !c.messages.is_empty())
    }

    /// All conversations, most recently updated first.
    pub fn recent_conversations(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .iter()
            .map(|(id, conv)| ConversationSummary {
                id: id.clone(),
                name: conv.assistant_name.clone(),
                last_update: conv.last_update,
                message_count: conv.messages.len(),
            })
            .collect();
        summaries.sort_by(|a, b| b.last_update.cmp(&a.last_update));
        summaries
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_cap_drops_oldest_first() {
        let mut history = MessageHistory::new();
        for i in 0..105 {
            history.record_at("a1", "Assistente", &format!("msg {}", i), true, i as i64);
        }

        let messages = history.messages_for("a1");
        assert_eq!(messages.len(), MAX_MESSAGES_PER_CONVERSATION);
        // Survivors keep oldest-first order, starting at the first kept one.
        assert_eq!(messages[0].text, "msg 5");
        assert_eq!(messages.last().unwrap().text, "msg 104");
    }

    #[test]
    fn test_eviction_removes_stalest_conversation() {
        let mut history = MessageHistory::new();
        for i in 0..6 {
            let id = format!("a{}", i);
            history.record_at(&id, "Assistente", "oi", true, i as i64 * 1000);
        }

        assert_eq!(history.len(), MAX_CONVERSATIONS);
        // a0 had the oldest last_update and must be gone.
        assert!(!history.has_conversation("a0"));
        assert!(history.has_conversation("a5"));
    }

    #[test]
    fn test_updating_old_conversation_protects_it_from_eviction() {
        let mut history = MessageHistory::new();
        for i in 0..5 {
            let id = format!("a{}", i);
            history.record_at(&id, "Assistente", "oi", true, i as i64 * 1000);
        }

        // Touch the stalest one, then insert a sixth.
        history.record_at("a0", "Assistente", "de novo", true, 99_000);
        history.record_at("a9", "Assistente", "oi", true, 100_000);

        assert!(history.has_conversation("a0"));
        // a1 became the stalest and was evicted instead.
        assert!(!history.has_conversation("a1"));
    }

    #[test]
    fn test_recent_conversations_sorted_desc() {
        let mut history = MessageHistory::new();
        history.record_at("a1", "Primeiro", "oi", true, 1000);
        history.record_at("a2", "Segundo", "oi", true, 2000);

        let recent = history.recent_conversations();
        assert_eq!(recent[0].name, "Segundo");
        assert_eq!(recent[1].name, "Primeiro");
    }

    #[test]
    fn test_json_round_trip() {
        let mut history = MessageHistory::new();
        history.record_at("a1", "Assistente", "olá", false, 42);

        let json = history.to_json().unwrap();
        let restored = MessageHistory::from_json(&json).unwrap();
        assert_eq!(restored.messages_for("a1").len(), 1);
        assert_eq!(restored.messages_for("a1")[0].text, "olá");
    }
}
