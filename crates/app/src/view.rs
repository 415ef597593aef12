//! View models for the chat and their terminal rendering.
//!
//! Session code builds structured values (bubbles and document cards); only
//! this module turns them into printable text. All model-derived text is
//! sanitized before display, and the rich-text tags the parser injects are
//! reduced to plain text here.

use chrono::Local;
use regex::Regex;
use shared::documento::{DocumentKind, ParsedDocument};
use std::sync::LazyLock;

static RE_TAGS_HTML: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// One chat message ready for display.
#[derive(Debug, Clone)]
pub struct ChatBubble {
    pub texto: String,
    pub de_usuario: bool,
    pub horario: String,
}

impl ChatBubble {
    pub fn new(texto: impl Into<String>, de_usuario: bool) -> Self {
        Self {
            texto: texto.into(),
            de_usuario,
            horario: Local::now().format("%H:%M").to_string(),
        }
    }
}

/// Follow-up card offering print/PDF actions for a generated document.
#[derive(Debug, Clone)]
pub struct DocumentCard {
    pub kind: DocumentKind,
    pub data: String,
    pub valor: Option<String>,
    pub descricao_preview: String,
}

impl DocumentCard {
    pub fn from_documento(documento: &ParsedDocument) -> Self {
        Self {
            kind: documento.kind,
            data: documento.data.clone(),
            valor: documento.valor.clone(),
            descricao_preview: truncar_preview(&documento.descricao),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Bubble(ChatBubble),
    Card(DocumentCard),
}

/// Cap the card description at 150 characters with an ellipsis.
fn truncar_preview(descricao: &str) -> String {
    if descricao.chars().count() <= 150 {
        return descricao.to_string();
    }
    let truncada: String = descricao.chars().take(147).collect();
    format!("{}...", truncada)
}

/// Drop control characters (except newline and tab) from model-derived text.
pub fn sanitizar(texto: &str) -> String {
    texto
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn texto_plano(texto: &str) -> String {
    sanitizar(&RE_TAGS_HTML.replace_all(texto, ""))
}

pub fn render_bubble(bubble: &ChatBubble) -> String {
    let autor = if bubble.de_usuario { "Você" } else { "🤖" };
    let texto = texto_plano(&bubble.texto);
    // Indent continuation lines under the author column.
    let texto = texto.replace('\n', "\n    ");
    format!("[{}] {}: {}", bubble.horario, autor, texto)
}

pub fn render_card(card: &DocumentCard) -> String {
    let mut linhas = vec![
        "┌──────────────────────────────────────────────".to_string(),
        format!("│ Documento de {} Gerado", card.kind.rotulo()),
        format!("│ Data: {}", texto_plano(&card.data)),
    ];
    if let Some(valor) = &card.valor {
        linhas.push(format!("│ Valor: R$ {}", texto_plano(valor)));
    }
    linhas.push(format!(
        "│ Descrição: {}",
        texto_plano(&card.descricao_preview).replace('\n', " ")
    ));
    linhas.push("│ Use /imprimir para a versão para impressão".to_string());
    linhas.push("└──────────────────────────────────────────────".to_string());
    linhas.join("\n")
}

pub fn render_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Bubble(bubble) => render_bubble(bubble),
        SessionEvent::Card(card) => render_card(card),
    }
}

/// Printable plain-text version of a generated document.
pub fn render_documento_impressao(documento: &ParsedDocument, corpo: &str) -> String {
    let timestamp = Local::now().format("%d/%m/%Y %H:%M:%S");
    let mut partes = vec![
        "CONDOMÍNIO".to_string(),
        documento.kind.titulo().to_string(),
        "----------------------------------------".to_string(),
        String::new(),
        format!("Data: {}", texto_plano(&documento.data)),
    ];
    if let Some(valor) = &documento.valor {
        partes.push(format!("Valor da Multa: R$ {}", texto_plano(valor)));
    }
    partes.push(String::new());
    partes.push(texto_plano(corpo));
    partes.push(String::new());
    partes.push("____________________________".to_string());
    partes.push("Assinatura do Notificado".to_string());
    partes.push(String::new());
    partes.push(format!(
        "Este documento foi gerado automaticamente pelo sistema em {}.",
        timestamp
    ));
    partes.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documento() -> ParsedDocument {
        ParsedDocument {
            kind: DocumentKind::Multa,
            data: "10/05/2024".into(),
            valor: Some("200,00".into()),
            descricao: "Vaga ocupada indevidamente".into(),
            fundamentacao: None,
        }
    }

    #[test]
    fn test_preview_truncado_em_150() {
        let longa = "x".repeat(200);
        let card = DocumentCard::from_documento(&ParsedDocument {
            descricao: longa,
            ..documento()
        });
        assert_eq!(card.descricao_preview.chars().count(), 150);
        assert!(card.descricao_preview.ends_with("..."));
    }

    #[test]
    fn test_preview_curto_intacto() {
        let card = DocumentCard::from_documento(&documento());
        assert_eq!(card.descricao_preview, "Vaga ocupada indevidamente");
    }

    #[test]
    fn test_sanitizar_remove_controles() {
        assert_eq!(sanitizar("a\u{7}b\nc"), "ab\nc");
    }

    #[test]
    fn test_render_bubble_remove_tags() {
        let bubble = ChatBubble::new("<strong class='text-danger'>🔴 MULTA GERADA</strong> ok", false);
        let saida = render_bubble(&bubble);
        assert!(saida.contains("🔴 MULTA GERADA ok"));
        assert!(!saida.contains("<strong"));
    }

    #[test]
    fn test_render_card_inclui_valor_para_multa() {
        let card = DocumentCard::from_documento(&documento());
        let saida = render_card(&card);
        assert!(saida.contains("Documento de Multa Gerado"));
        assert!(saida.contains("Valor: R$ 200,00"));
    }

    #[test]
    fn test_documento_impressao_estrutura() {
        let saida = render_documento_impressao(&documento(), "Prezado Sr./Sra. João,\n\nCorpo.");
        assert!(saida.starts_with("CONDOMÍNIO\nNOTIFICAÇÃO DE MULTA"));
        assert!(saida.contains("Valor da Multa: R$ 200,00"));
        assert!(saida.contains("Assinatura do Notificado"));
        assert!(saida.contains("gerado automaticamente pelo sistema"));
    }
}
