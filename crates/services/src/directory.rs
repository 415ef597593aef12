//! Assistant directory client for the condominium backend.
//!
//! The backend keeps a synced copy of the per-condominium assistants; the
//! chat view lists them with pagination and search, and the document
//! pipeline looks one up to name the condominium in the fallback prompt.

use regex::Regex;
use serde::Deserialize;
use shared::error::AssistError;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

static DIRECTORY_HTTP: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build HTTP client")
});

/// Leading "467 - " style enumeration prefix on synced assistant names.
static RE_PREFIXO_NUMERICO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*-\s*").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl AssistantInfo {
    /// Display name with the numeric enumeration prefix stripped
    /// ("467 - CUBE ITAIM" → "CUBE ITAIM").
    pub fn display_name(&self) -> String {
        formatar_nome_assistente(self.name.as_deref())
    }
}

pub fn formatar_nome_assistente(nome: Option<&str>) -> String {
    match nome {
        Some(nome) if !nome.is_empty() => RE_PREFIXO_NUMERICO.replace(nome, "").to_string(),
        _ => "Assistente".to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub struct AssistantPage {
    #[serde(default)]
    pub assistants: Vec<AssistantInfo>,
    #[serde(default)]
    pub has_more: bool,
}

pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: DIRECTORY_HTTP.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Paginated listing with an optional search term.
    pub async fn listar_assistentes(
        &self,
        limit: usize,
        offset: usize,
        search: Option<&str>,
    ) -> Result<AssistantPage, AssistError> {
        let mut params = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }

        let url = format!("{}/list-assistants", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(AssistError::transport)?;

        if !resp.status().is_success() {
            return Err(AssistError::transport(format!(
                "erro ao carregar assistentes: {}",
                resp.status()
            )));
        }

        let page: AssistantPage = resp.json().await.map_err(AssistError::transport)?;
        debug!(count = page.assistants.len(), has_more = page.has_more, "assistants listed");
        Ok(page)
    }

    /// Single assistant lookup; `None` when the backend does not know it.
    pub async fn buscar_assistente(
        &self,
        assistant_id: &str,
    ) -> Result<Option<AssistantInfo>, AssistError> {
        let url = format!("{}/assistants/{}", self.base_url, assistant_id);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(AssistError::transport)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AssistError::transport(format!(
                "erro ao obter assistente: {}",
                resp.status()
            )));
        }

        let info: AssistantInfo = resp.json().await.map_err(AssistError::transport)?;
        Ok(Some(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatar_nome_remove_prefixo() {
        assert_eq!(formatar_nome_assistente(Some("467 - CUBE ITAIM")), "CUBE ITAIM");
        assert_eq!(formatar_nome_assistente(Some("12- Residencial Aurora")), "Residencial Aurora");
    }

    #[test]
    fn test_formatar_nome_sem_prefixo() {
        assert_eq!(formatar_nome_assistente(Some("Residencial Aurora")), "Residencial Aurora");
    }

    #[test]
    fn test_formatar_nome_vazio_usa_padrao() {
        assert_eq!(formatar_nome_assistente(None), "Assistente");
        assert_eq!(formatar_nome_assistente(Some("")), "Assistente");
    }
}
