use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::chat_api::ChatMessage;
use shared::error::AssistError;
use shared::settings::ApiAuth;
use std::sync::LazyLock;
use std::time::Duration;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com";

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Stateless Chat Completions client, used as the fallback generation path
/// when the per-condominium assistant cannot be reached.
pub struct CompletionClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
}

impl CompletionClient {
    pub fn from_auth(model: &str, auth: &ApiAuth) -> Result<Self, AssistError> {
        let auth_token = auth.resolve().ok_or_else(|| {
            AssistError::configuration("chave da API da OpenAI não configurada")
        })?;
        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f32>,
    ) -> Result<String, AssistError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let req = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature,
        };
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await
            .map_err(AssistError::transport)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            if detail.trim().is_empty() {
                return Err(AssistError::transport(format!("openai error: {}", status)));
            }
            return Err(AssistError::transport(format!(
                "openai error: {}\n{}",
                status, detail
            )));
        }

        let body: CompletionResponse = resp.json().await.map_err(AssistError::transport)?;
        let text = body
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        Ok(text)
    }
}

pub(crate) fn shared_http() -> Client {
    SHARED_HTTP.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_auth_requires_credential() {
        let auth = ApiAuth { api_key: None };
        // Only meaningful when the env var is absent; skip otherwise.
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(matches!(
                CompletionClient::from_auth("gpt-4-turbo", &auth),
                Err(AssistError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_from_auth_with_explicit_key() {
        let auth = ApiAuth {
            api_key: Some("sk-test".into()),
        };
        let client = CompletionClient::from_auth("gpt-4-turbo", &auth).unwrap();
        assert_eq!(client.model, "gpt-4-turbo");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }
}
