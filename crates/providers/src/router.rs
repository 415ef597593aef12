use crate::assistants::AssistantsClient;
use crate::openai::CompletionClient;
use shared::chat_api::ChatMessage;
use shared::error::AssistError;
use shared::settings::{ApiAuth, GenerationSettings};
use std::time::Duration;
use tracing::{info, warn};

/// Primary generation request: a one-shot thread against the condominium's
/// configured assistant.
pub struct AssistantPrompt {
    pub assistant_id: Option<String>,
    pub prompt: String,
}

/// Fallback request: a stateless completion carrying the same formatting
/// contract as a system instruction.
pub struct CompletionPrompt {
    pub system: String,
    pub prompt: String,
}

/// Two-stage generation strategy: try the stateful assistant path first and
/// degrade to the stateless completion path on any primary failure —
/// missing configuration, transport error, failed run, timeout or an empty
/// reply. Only a fallback failure is terminal.
pub struct GenerationRouter {
    auth: ApiAuth,
    settings: GenerationSettings,
}

impl GenerationRouter {
    pub fn new(auth: ApiAuth, settings: GenerationSettings) -> Self {
        Self { auth, settings }
    }

    pub async fn generate(
        &self,
        primary: AssistantPrompt,
        fallback: CompletionPrompt,
    ) -> Result<String, AssistError> {
        match self.generate_with_assistant(&primary).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                warn!(error = %e, "primary generation path failed; using fallback");
            }
        }

        self.generate_with_completion(&fallback)
            .await
            .map_err(|e| AssistError::generation(e.to_string()))
    }

    async fn generate_with_assistant(
        &self,
        primary: &AssistantPrompt,
    ) -> Result<String, AssistError> {
        let assistant_id = primary.assistant_id.as_deref().ok_or_else(|| {
            AssistError::configuration("assistente do condomínio não especificado")
        })?;

        let client = AssistantsClient::from_auth(&self.auth)?;

        let thread_id = client.create_thread().await?;
        client.add_message(&thread_id, &primary.prompt).await?;
        let run = client.create_run(&thread_id, assistant_id, None).await?;
        client
            .wait_for_run(
                &thread_id,
                &run.id,
                Duration::from_millis(self.settings.poll_interval_ms),
                self.settings.max_poll_attempts,
            )
            .await?;

        let messages = client.list_messages(&thread_id).await?;
        AssistantsClient::latest_assistant_text(&messages)
            .ok_or_else(|| AssistError::generation("nenhuma resposta do assistente"))
    }

    async fn generate_with_completion(
        &self,
        fallback: &CompletionPrompt,
    ) -> Result<String, AssistError> {
        info!(model = %self.settings.fallback_model, "generating via completion fallback");
        let client = CompletionClient::from_auth(&self.settings.fallback_model, &self.auth)?;
        let messages = vec![
            ChatMessage::system(&fallback.system),
            ChatMessage::user(&fallback.prompt),
        ];
        let text = client.generate(messages, Some(0.7)).await?;
        if text.trim().is_empty() {
            return Err(AssistError::generation("resposta vazia do modelo"));
        }
        Ok(text)
    }
}
