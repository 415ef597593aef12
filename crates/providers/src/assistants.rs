//! Client for the OpenAI Assistants v2 API.
//!
//! Covers the surface the application actually consumes: assistant CRUD and
//! listing for the admin screens, plus the thread → message → run → poll →
//! messages cycle the document pipeline and chat view drive.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::error::AssistError;
use shared::settings::ApiAuth;
use std::time::Duration;
use tracing::{debug, info, warn};

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantList {
    pub data: Vec<Assistant>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct AssistantSpec {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thread {
    id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired | RunStatus::Incomplete
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default)]
    pub text: Option<ContentText>,
}

#[derive(Debug, Deserialize)]
pub struct ContentText {
    pub value: String,
}

// ── Client ───────────────────────────────────────────────────────────

pub struct AssistantsClient {
    http: Client,
    auth_token: String,
    base_url: String,
}

impl AssistantsClient {
    pub fn from_auth(auth: &ApiAuth) -> Result<Self, AssistError> {
        let auth_token = auth.resolve().ok_or_else(|| {
            AssistError::configuration("chave da API da OpenAI não configurada")
        })?;
        Ok(Self {
            http: crate::openai::shared_http(),
            auth_token,
            base_url: crate::openai::DEFAULT_BASE_URL.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/v1{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "application/json")
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn check(resp: reqwest::Response, context: &str) -> Result<reqwest::Response, AssistError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let detail: String = body.chars().take(800).collect();
        Err(AssistError::transport(format!(
            "{}: {} {}",
            context, status, detail
        )))
    }

    // ── Assistant directory (admin screens) ──────────────────────────

    pub async fn list_assistants(
        &self,
        limit: usize,
        order: &str,
        after: Option<&str>,
    ) -> Result<AssistantList, AssistError> {
        let mut params = vec![("limit", limit.to_string()), ("order", order.to_string())];
        if let Some(after) = after {
            params.push(("after", after.to_string()));
        }
        let resp = self
            .request(reqwest::Method::GET, "/assistants")
            .query(&params)
            .send()
            .await
            .map_err(AssistError::transport)?;
        let resp = Self::check(resp, "erro ao listar assistentes").await?;
        resp.json().await.map_err(AssistError::transport)
    }

    pub async fn get_assistant(&self, assistant_id: &str) -> Result<Assistant, AssistError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/assistants/{}", assistant_id))
            .send()
            .await
            .map_err(AssistError::transport)?;
        let resp = Self::check(resp, "erro ao obter assistente").await?;
        resp.json().await.map_err(AssistError::transport)
    }

    pub async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant, AssistError> {
        let resp = self
            .request(reqwest::Method::POST, "/assistants")
            .json(spec)
            .send()
            .await
            .map_err(AssistError::transport)?;
        let resp = Self::check(resp, "erro ao criar assistente").await?;
        resp.json().await.map_err(AssistError::transport)
    }

    pub async fn update_assistant(
        &self,
        assistant_id: &str,
        spec: &AssistantSpec,
    ) -> Result<Assistant, AssistError> {
        let resp = self
            .request(reqwest::Method::POST, &format!("/assistants/{}", assistant_id))
            .json(spec)
            .send()
            .await
            .map_err(AssistError::transport)?;
        let resp = Self::check(resp, "erro ao atualizar assistente").await?;
        resp.json().await.map_err(AssistError::transport)
    }

    pub async fn delete_assistant(&self, assistant_id: &str) -> Result<(), AssistError> {
        let resp = self
            .request(
                reqwest::Method::DELETE,
                &format!("/assistants/{}", assistant_id),
            )
            .send()
            .await
            .map_err(AssistError::transport)?;
        Self::check(resp, "erro ao excluir assistente").await?;
        Ok(())
    }

    // ── Thread / run cycle ───────────────────────────────────────────

    pub async fn create_thread(&self) -> Result<String, AssistError> {
        let resp = self
            .request(reqwest::Method::POST, "/threads")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(AssistError::transport)?;
        let resp = Self::check(resp, "erro ao criar thread").await?;
        let thread: Thread = resp.json().await.map_err(AssistError::transport)?;
        info!(thread_id = %thread.id, "thread created");
        Ok(thread.id)
    }

    pub async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), AssistError> {
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/threads/{}/messages", thread_id),
            )
            .json(&serde_json::json!({ "role": "user", "content": content }))
            .send()
            .await
            .map_err(AssistError::transport)?;
        Self::check(resp, "erro ao adicionar mensagem").await?;
        Ok(())
    }

    pub async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<&str>,
    ) -> Result<Run, AssistError> {
        let mut body = serde_json::json!({ "assistant_id": assistant_id });
        if let Some(instructions) = instructions {
            body["instructions"] = serde_json::Value::String(instructions.to_string());
        }
        let resp = self
            .request(reqwest::Method::POST, &format!("/threads/{}/runs", thread_id))
            .json(&body)
            .send()
            .await
            .map_err(AssistError::transport)?;
        let resp = Self::check(resp, "erro ao executar assistente").await?;
        let run: Run = resp.json().await.map_err(AssistError::transport)?;
        info!(run_id = %run.id, "run started");
        Ok(run)
    }

    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistError> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/threads/{}/runs/{}", thread_id, run_id),
            )
            .send()
            .await
            .map_err(AssistError::transport)?;
        let resp = Self::check(resp, "erro ao obter status da execução").await?;
        resp.json().await.map_err(AssistError::transport)
    }

    /// Poll a run at a fixed interval until it completes. A terminal failure
    /// or exhausting `max_attempts` is a generation error, which callers use
    /// to trigger the fallback path.
    pub async fn wait_for_run(
        &self,
        thread_id: &str,
        run_id: &str,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Result<(), AssistError> {
        for attempt in 0..max_attempts {
            let run = self.retrieve_run(thread_id, run_id).await?;

            match run.status {
                RunStatus::Completed => return Ok(()),
                status if status.is_terminal_failure() => {
                    let detail = run
                        .last_error
                        .map(|e| e.message)
                        .unwrap_or_else(|| "erro desconhecido".into());
                    warn!(run_id = %run_id, ?status, %detail, "run failed");
                    return Err(AssistError::generation(format!(
                        "falha ao executar o assistente: {}",
                        detail
                    )));
                }
                status => {
                    if attempt % 5 == 0 {
                        debug!(run_id = %run_id, ?status, attempt, "run still pending");
                    }
                }
            }

            tokio::time::sleep(poll_interval).await;
        }

        Err(AssistError::generation(
            "timeout ao aguardar resposta do assistente",
        ))
    }

    pub async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistError> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/threads/{}/messages", thread_id),
            )
            .send()
            .await
            .map_err(AssistError::transport)?;
        let resp = Self::check(resp, "erro ao obter mensagens").await?;
        let list: MessageList = resp.json().await.map_err(AssistError::transport)?;
        Ok(list.data)
    }

    /// Concatenated text of the most recent assistant message, if any.
    pub fn latest_assistant_text(messages: &[ThreadMessage]) -> Option<String> {
        let message = messages.iter().find(|m| m.role == "assistant")?;
        let text: String = message
            .content
            .iter()
            .filter(|part| part.part_type == "text")
            .filter_map(|part| part.text.as_ref().map(|t| t.value.as_str()))
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_deserializes_snake_case() {
        let run: Run =
            serde_json::from_str(r#"{"id":"run_1","status":"in_progress"}"#).unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(run.last_error.is_none());
    }

    #[test]
    fn test_terminal_failure_statuses() {
        assert!(RunStatus::Failed.is_terminal_failure());
        assert!(RunStatus::Expired.is_terminal_failure());
        assert!(!RunStatus::Completed.is_terminal_failure());
        assert!(!RunStatus::InProgress.is_terminal_failure());
    }

    #[test]
    fn test_latest_assistant_text_concatenates_parts() {
        let messages: Vec<ThreadMessage> = serde_json::from_str(
            r#"[
                {"role":"assistant","content":[
                    {"type":"text","text":{"value":"Prezado "}},
                    {"type":"text","text":{"value":"Sr./Sra."}}
                ]},
                {"role":"user","content":[{"type":"text","text":{"value":"oi"}}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            AssistantsClient::latest_assistant_text(&messages).as_deref(),
            Some("Prezado Sr./Sra.")
        );
    }

    #[test]
    fn test_latest_assistant_text_none_when_empty() {
        let messages: Vec<ThreadMessage> =
            serde_json::from_str(r#"[{"role":"user","content":[]}]"#).unwrap();
        assert!(AssistantsClient::latest_assistant_text(&messages).is_none());
    }
}
