//! Document text pipeline: collected flow data in, finished document body
//! out.
//!
//! Composition and cleanup are pure; only the generation call in the middle
//! touches the network. The router degrades from the condominium's assistant
//! to a stateless completion on any primary failure, so a reachable API key
//! is enough to always produce some document.

use providers::router::{AssistantPrompt, CompletionPrompt, GenerationRouter};
use serde_json::{Map, Value};
use services::directory::DirectoryClient;
use services::posprocess::{limpar_resposta, pos_processar};
use services::prompt::{instrucao_sistema_fallback, montar_prompt};
use shared::documento::{DocumentKind, Morador, Ocorrencia};
use shared::error::AssistError;
use shared::settings::AppSettings;
use tracing::{debug, info, warn};

pub const DOCUMENTO_VAZIO: &str = "Não foi possível gerar o documento.";

const CONDOMINIO_PADRAO: &str = "Condomínio";

/// Build an [`Ocorrencia`] from the map a completed guided flow produced.
pub fn ocorrencia_do_fluxo(
    dados: &Map<String, Value>,
    assistant_id: Option<String>,
) -> Ocorrencia {
    let campo = |nome: &str| {
        dados
            .get(nome)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };

    let valor = dados
        .get("valor")
        .and_then(Value::as_str)
        .and_then(|texto| texto.trim().replace(',', ".").parse::<f64>().ok());

    Ocorrencia {
        data: campo("data"),
        valor,
        descricao: campo("descricao"),
        morador: Morador::default(),
        external_assistant_id: assistant_id,
    }
}

pub struct DocumentPipeline {
    router: GenerationRouter,
    directory: DirectoryClient,
}

impl DocumentPipeline {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            router: GenerationRouter::new(settings.auth.clone(), settings.generation.clone()),
            directory: DirectoryClient::new(&settings.backend_url),
        }
    }

    /// Generate and clean one document body. Terminal failure only when the
    /// fallback path also failed.
    pub async fn gerar_documento(
        &self,
        ocorrencia: &Ocorrencia,
        kind: DocumentKind,
    ) -> Result<String, AssistError> {
        let condominio = self.nome_condominio(ocorrencia).await;
        info!(tipo = %kind, condominio = %condominio, "generating document");

        let prompt = montar_prompt(kind, ocorrencia);
        let inicio: String = prompt.chars().take(150).collect();
        debug!(prompt = %inicio, "prompt composed");

        let primary = AssistantPrompt {
            assistant_id: ocorrencia.external_assistant_id.clone(),
            prompt: prompt.clone(),
        };
        let fallback = CompletionPrompt {
            system: instrucao_sistema_fallback(&condominio, kind),
            prompt,
        };

        let resposta = self.router.generate(primary, fallback).await?;

        let documento = limpar_resposta(&resposta);
        let documento = pos_processar(&documento, kind);

        if documento.trim().is_empty() {
            return Ok(DOCUMENTO_VAZIO.to_string());
        }
        Ok(documento)
    }

    /// Condominium name for the fallback system instruction, taken from the
    /// assistant directory when possible.
    async fn nome_condominio(&self, ocorrencia: &Ocorrencia) -> String {
        let Some(assistant_id) = ocorrencia.external_assistant_id.as_deref() else {
            return CONDOMINIO_PADRAO.to_string();
        };

        match self.directory.buscar_assistente(assistant_id).await {
            Ok(Some(info)) => {
                debug!(assistant_id, nome = %info.display_name(), modelo = ?info.model, "assistant found");
                info.display_name()
            }
            Ok(None) => CONDOMINIO_PADRAO.to_string(),
            Err(e) => {
                warn!(assistant_id, error = %e, "assistant lookup failed");
                CONDOMINIO_PADRAO.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocorrencia_do_fluxo_multa() {
        let mut dados = Map::new();
        dados.insert("data".into(), Value::String("2024-03-15".into()));
        dados.insert("valor".into(), Value::String("150.00".into()));
        dados.insert(
            "descricao".into(),
            Value::String("Barulho excessivo após 22h".into()),
        );
        dados.insert("imagens".into(), Value::Array(Vec::new()));

        let ocorrencia = ocorrencia_do_fluxo(&dados, Some("asst_1".into()));
        assert_eq!(ocorrencia.data, "2024-03-15");
        assert_eq!(ocorrencia.valor, Some(150.0));
        assert_eq!(ocorrencia.descricao, "Barulho excessivo após 22h");
        assert_eq!(ocorrencia.external_assistant_id.as_deref(), Some("asst_1"));
        assert_eq!(ocorrencia.morador.nome, "Morador(a)");
    }

    #[test]
    fn test_ocorrencia_do_fluxo_valor_com_virgula() {
        let mut dados = Map::new();
        dados.insert("valor".into(), Value::String("99,90".into()));
        let ocorrencia = ocorrencia_do_fluxo(&dados, None);
        assert_eq!(ocorrencia.valor, Some(99.9));
    }

    #[test]
    fn test_ocorrencia_do_fluxo_sem_valor() {
        let dados = Map::new();
        let ocorrencia = ocorrencia_do_fluxo(&dados, None);
        assert_eq!(ocorrencia.valor, None);
        assert_eq!(ocorrencia.data, "");
    }
}
