//! Core domain types for infraction documents.

use serde::{Deserialize, Serialize};

/// The two document families the condominium can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Advertencia,
    Multa,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Advertencia => "advertencia",
            DocumentKind::Multa => "multa",
        }
    }

    /// Uppercase title as it appears in the generated document header.
    pub fn titulo(&self) -> &'static str {
        match self {
            DocumentKind::Advertencia => "ADVERTÊNCIA",
            DocumentKind::Multa => "NOTIFICAÇÃO DE MULTA",
        }
    }

    /// Human label for cards and summaries.
    pub fn rotulo(&self) -> &'static str {
        match self {
            DocumentKind::Advertencia => "Advertência",
            DocumentKind::Multa => "Multa",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resident the document is addressed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Morador {
    pub nome: String,
    pub apartamento: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bloco: Option<String>,
}

impl Default for Morador {
    fn default() -> Self {
        Self {
            nome: "Morador(a)".into(),
            apartamento: "Não informada".into(),
            bloco: None,
        }
    }
}

/// One incident, assembled from a completed guided flow and handed to the
/// document pipeline. Transient: discarded once the response is handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ocorrencia {
    /// Incident date as collected ("2024-03-15" or "15/03/2024").
    pub data: String,
    /// Fine amount; `None` for advertências.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor: Option<f64>,
    pub descricao: String,
    #[serde(default)]
    pub morador: Morador,
    /// Per-condominium assistant bound to this incident.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_assistant_id: Option<String>,
}

/// Structured fields extracted from a generated reply. Used only to render
/// the summary card and the printable document; never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub kind: DocumentKind,
    pub data: String,
    /// Formatted amount ("200,00"); multas only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor: Option<String>,
    pub descricao: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fundamentacao: Option<String>,
}

/// Descriptor of one uploaded evidence image, as returned by the storage
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagemDescriptor {
    pub nome_original: String,
    pub nome_arquivo: String,
    pub url_relativa: String,
}

/// Reference to a confirmed image set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub documento_id: String,
    pub imagens: Vec<ImagemDescriptor>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&DocumentKind::Advertencia).unwrap();
        assert_eq!(json, "\"advertencia\"");
        let kind: DocumentKind = serde_json::from_str("\"multa\"").unwrap();
        assert_eq!(kind, DocumentKind::Multa);
    }

    #[test]
    fn test_titulos() {
        assert_eq!(DocumentKind::Advertencia.titulo(), "ADVERTÊNCIA");
        assert_eq!(DocumentKind::Multa.titulo(), "NOTIFICAÇÃO DE MULTA");
    }
}
