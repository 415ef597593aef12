//! Evidence image upload client.
//!
//! Validation limits live here so the flow engine can reject bad files
//! before any bytes leave the machine; the backend applies the same rules
//! on its side.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use shared::documento::{DocumentKind, ImagemDescriptor, UploadResult};
use shared::error::AssistError;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::info;

/// Per-file size cap: 5 MiB.
pub const TAMANHO_MAXIMO: u64 = 5 * 1024 * 1024;

const EXTENSOES_SUPORTADAS: &[&str] = &["jpg", "jpeg", "png"];

static UPLOAD_HTTP: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .expect("failed to build HTTP client")
});

/// A candidate image picked by the user, not yet uploaded.
#[derive(Debug, Clone)]
pub struct ImagemLocal {
    pub caminho: PathBuf,
    pub nome: String,
    pub tamanho: u64,
}

impl ImagemLocal {
    pub fn from_path(caminho: &Path) -> Result<Self, AssistError> {
        let metadata = std::fs::metadata(caminho)
            .map_err(|e| AssistError::validation(format!("arquivo inacessível: {}", e)))?;
        let nome = caminho
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| AssistError::validation("caminho de imagem sem nome de arquivo"))?;
        Ok(Self {
            caminho: caminho.to_path_buf(),
            nome,
            tamanho: metadata.len(),
        })
    }
}

/// JPEG/PNG only, decided by extension.
pub fn formato_suportado(nome: &str) -> bool {
    Path::new(nome)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSOES_SUPORTADAS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn tamanho_permitido(tamanho: u64) -> bool {
    tamanho <= TAMANHO_MAXIMO
}

/// Readable size for warning messages ("2.35 MB").
pub fn formatar_tamanho(bytes: u64) -> String {
    const UNIDADES: &[&str] = &["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".into();
    }
    let i = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let i = i.min(UNIDADES.len() - 1);
    let valor = bytes as f64 / 1024f64.powi(i as i32);
    format!("{:.2} {}", valor, UNIDADES[i])
        .replace(".00 ", " ")
}

/// Storage collaborator the image step uploads a confirmed set to.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn enviar(
        &self,
        documento_id: &str,
        tipo: DocumentKind,
        imagens: &[ImagemLocal],
    ) -> Result<UploadResult, AssistError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    imagens: Vec<ImagemDescriptor>,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    error: Option<String>,
}

/// Uploads image sets to the condominium backend.
pub struct UploadClient {
    http: reqwest::Client,
    base_url: String,
}

impl UploadClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: UPLOAD_HTTP.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageUploader for UploadClient {
    async fn enviar(
        &self,
        documento_id: &str,
        tipo: DocumentKind,
        imagens: &[ImagemLocal],
    ) -> Result<UploadResult, AssistError> {
        let mut form = Form::new()
            .text("documento_id", documento_id.to_string())
            .text("tipo", tipo.as_str().to_string());

        for (indice, imagem) in imagens.iter().enumerate() {
            let bytes = tokio::fs::read(&imagem.caminho)
                .await
                .map_err(|e| AssistError::transport(format!("erro ao ler imagem: {}", e)))?;
            let part = Part::bytes(bytes).file_name(imagem.nome.clone());
            form = form.part(format!("imagem_{}", indice), part);
        }

        let url = format!("{}/upload-imagens-documento", self.base_url);
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(AssistError::transport)?;

        if !resp.status().is_success() {
            return Err(AssistError::transport(format!(
                "erro ao fazer upload das imagens: {}",
                resp.status()
            )));
        }

        let body: UploadResponse = resp.json().await.map_err(AssistError::transport)?;
        if !body.success {
            return Err(AssistError::transport(
                body.error
                    .unwrap_or_else(|| "erro desconhecido no upload".into()),
            ));
        }

        info!(documento_id, total = body.total, "images uploaded");
        Ok(UploadResult {
            documento_id: documento_id.to_string(),
            imagens: body.imagens,
            total: body.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formato_suportado_por_extensao() {
        assert!(formato_suportado("fachada.jpg"));
        assert!(formato_suportado("FACHADA.JPEG"));
        assert!(formato_suportado("portaria.png"));
        assert!(!formato_suportado("laudo.pdf"));
        assert!(!formato_suportado("sem_extensao"));
    }

    #[test]
    fn test_tamanho_permitido_no_limite() {
        assert!(tamanho_permitido(TAMANHO_MAXIMO));
        assert!(!tamanho_permitido(TAMANHO_MAXIMO + 1));
    }

    #[test]
    fn test_formatar_tamanho() {
        assert_eq!(formatar_tamanho(0), "0 Bytes");
        assert_eq!(formatar_tamanho(512), "512 Bytes");
        assert_eq!(formatar_tamanho(2048), "2 KB");
        assert_eq!(formatar_tamanho(5 * 1024 * 1024), "5 MB");
    }

    #[test]
    fn test_imagem_local_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let caminho = dir.path().join("evidencia.png");
        std::fs::write(&caminho, b"fake png bytes").unwrap();

        let imagem = ImagemLocal::from_path(&caminho).unwrap();
        assert_eq!(imagem.nome, "evidencia.png");
        assert_eq!(imagem.tamanho, 14);
    }

    #[test]
    fn test_imagem_local_inexistente() {
        let resultado = ImagemLocal::from_path(Path::new("/nao/existe.png"));
        assert!(matches!(resultado, Err(AssistError::Validation(_))));
    }
}
