//! Per-user registry of active conversation threads.
//!
//! The chat view reuses one thread per user until the user explicitly starts
//! a new conversation, at which point the mapping is dropped and the next
//! message creates a fresh thread.

use crate::assistants::AssistantsClient;
use shared::error::AssistError;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

#[derive(Default)]
pub struct ThreadRegistry {
    active_threads: HashMap<String, String>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(
        &mut self,
        client: &AssistantsClient,
        user_id: &str,
    ) -> Result<String, AssistError> {
        if let Some(thread_id) = self.active_threads.get(user_id) {
            return Ok(thread_id.clone());
        }
        let thread_id = client.create_thread().await?;
        self.active_threads
            .insert(user_id.to_string(), thread_id.clone());
        Ok(thread_id)
    }

    /// Forget the user's thread so the next message starts a new one.
    pub fn reset(&mut self, user_id: &str) {
        if self.active_threads.remove(user_id).is_some() {
            info!(%user_id, "thread reset");
        }
    }

    pub fn active_thread(&self, user_id: &str) -> Option<&str> {
        self.active_threads.get(user_id).map(String::as_str)
    }

    /// One full conversational turn: append the message to the user's thread,
    /// run the assistant, wait for completion and return the raw reply text.
    pub async fn chat(
        &mut self,
        client: &AssistantsClient,
        assistant_id: &str,
        message: &str,
        user_id: &str,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Result<String, AssistError> {
        let thread_id = self.get_or_create(client, user_id).await?;
        client.add_message(&thread_id, message).await?;
        let run = client.create_run(&thread_id, assistant_id, None).await?;
        client
            .wait_for_run(&thread_id, &run.id, poll_interval, max_attempts)
            .await?;

        let messages = client.list_messages(&thread_id).await?;
        AssistantsClient::latest_assistant_text(&messages).ok_or_else(|| {
            AssistError::generation("não foi possível obter uma resposta do assistente")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_forgets_thread() {
        let mut registry = ThreadRegistry::new();
        registry
            .active_threads
            .insert("user_1".into(), "thread_1".into());

        assert_eq!(registry.active_thread("user_1"), Some("thread_1"));
        registry.reset("user_1");
        assert_eq!(registry.active_thread("user_1"), None);
    }

    #[test]
    fn test_reset_unknown_user_is_noop() {
        let mut registry = ThreadRegistry::new();
        registry.reset("nobody");
        assert!(registry.active_threads.is_empty());
    }
}
