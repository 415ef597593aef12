//! Parses assistant replies looking for a generated document block and
//! extracts its structured fields.
//!
//! Matching is two-phase: the strict markers ("ADVERTÊNCIA GERADA" /
//! "MULTA GERADA" up to "FIM DOCUMENTO" or end of text) are tried first,
//! then the looser decorated variants. Field extraction is first-match-wins
//! over labeled lines, with token-level and current-date/zero-value
//! fallbacks.

use chrono::Local;
use regex::Regex;
use shared::documento::{DocumentKind, ParsedDocument};
use std::sync::LazyLock;

static RE_ADVERTENCIA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ADVERTÊNCIA GERADA[\s\S]*?(?:FIM DOCUMENTO|$)").unwrap());
static RE_MULTA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)MULTA GERADA[\s\S]*?(?:FIM DOCUMENTO|$)").unwrap());

static RE_ADVERTENCIA_LIVRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:advertência gerada|⚠️ ADVERTÊNCIA GERADA)[\s\S]*").unwrap());
static RE_MULTA_LIVRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:multa gerada|🔴 MULTA GERADA)[\s\S]*").unwrap());

static RE_DATA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Data:?\s*([^\n]+)").unwrap());
static RE_DATA_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}/\d{1,2}/\d{2,4})").unwrap());

static RE_VALOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Valor:?\s*R?\$?\s*([0-9.,]+)").unwrap());
static RE_VALOR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)R\$\s*(\d+[.,]\d+)").unwrap());

static RE_MOTIVO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Motivo|Descrição|Infração):?\s*([^\n]+(?:\n[^\n]+)*)").unwrap()
});
static RE_FUNDAMENTACAO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Fundamentação|Base Legal|Artigo|Lei):?\s*([^\n]+(?:\n[^\n]+)*)").unwrap()
});
static RE_PALAVRAS_LEGAIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:(?:de acordo com|conforme|segundo|baseado n[ao]|nos termos d[ao]|[ao]rt(?:igo)?\.?)\s+(?:[0-9]+|[IVXLCDM]+))",
    )
    .unwrap()
});

static RE_TITULOS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:ADVERTÊNCIA GERADA:?|MULTA GERADA:?|FIM DOCUMENTO|⚠️ ADVERTÊNCIA GERADA|🔴 MULTA GERADA)")
        .unwrap()
});
static RE_LINHA_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Data:?\s*[^\n]+").unwrap());
static RE_LINHA_VALOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Valor:?\s*R?\$?\s*[0-9.,]+").unwrap());
static RE_LINHA_FUNDAMENTACAO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:Fundamentação|Base Legal|Artigo|Lei):?\s*[^\n]+").unwrap());
static RE_VAZIAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static RE_TITULO_MULTA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:MULTA GERADA:?|🔴 MULTA GERADA:?)").unwrap());
static RE_TITULO_ADVERTENCIA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:ADVERTÊNCIA GERADA:?|⚠️ ADVERTÊNCIA GERADA:?)").unwrap());
static RE_FRASES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Outcome of scanning one assistant reply.
#[derive(Debug, Clone)]
pub struct RespostaProcessada {
    /// Reply text ready for display: styled title, end marker stripped.
    pub texto_exibicao: String,
    /// Present when the reply contained a generated document.
    pub documento: Option<ParsedDocument>,
}

/// Scan a reply for a generated document. Returns the reply untouched when
/// no marker is found.
pub fn processar_resposta(resposta: &str) -> RespostaProcessada {
    let advertencia = RE_ADVERTENCIA
        .find(resposta)
        .or_else(|| RE_ADVERTENCIA_LIVRE.find(resposta));
    let multa = RE_MULTA.find(resposta).or_else(|| RE_MULTA_LIVRE.find(resposta));

    let (kind, bloco) = match (advertencia, multa) {
        // A fine marker wins over a warning marker in the same reply.
        (_, Some(m)) => (DocumentKind::Multa, m.as_str()),
        (Some(m), None) => (DocumentKind::Advertencia, m.as_str()),
        (None, None) => {
            return RespostaProcessada {
                texto_exibicao: resposta.to_string(),
                documento: None,
            }
        }
    };

    let data = extrair_data(bloco);
    let valor = match kind {
        DocumentKind::Multa => Some(extrair_valor_multa(bloco)),
        DocumentKind::Advertencia => None,
    };
    let fundamentacao = extrair_fundamentacao(bloco);
    let mut descricao = extrair_descricao(bloco, kind);

    if let Some(fundamentacao) = &fundamentacao {
        if !descricao.contains(fundamentacao.as_str()) {
            descricao.push_str("\n\nFundamentação: ");
            descricao.push_str(fundamentacao);
        }
    }

    let documento = ParsedDocument {
        kind,
        data,
        valor,
        descricao,
        fundamentacao,
    };

    RespostaProcessada {
        texto_exibicao: formatar_exibicao(resposta, kind),
        documento: Some(documento),
    }
}

/// "Valor:" labeled amount, or the default "0,00".
pub fn extrair_valor_multa(texto: &str) -> String {
    if let Some(caps) = RE_VALOR.captures(texto) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = RE_VALOR_TOKEN.captures(texto) {
        return caps[1].to_string();
    }
    "0,00".to_string()
}

fn extrair_data(bloco: &str) -> String {
    if let Some(caps) = RE_DATA.captures(bloco) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = RE_DATA_TOKEN.captures(bloco) {
        return caps[1].to_string();
    }
    Local::now().format("%d/%m/%Y").to_string()
}

fn extrair_descricao(bloco: &str, kind: DocumentKind) -> String {
    if let Some(caps) = RE_MOTIVO.captures(bloco) {
        return normalizar_descricao(&caps[1]);
    }

    // No labeled field: strip known labels and headers and keep the rest.
    let texto_limpo = RE_TITULOS.replace_all(bloco, "");
    let texto_limpo = RE_LINHA_DATA.replace(&texto_limpo, "");
    let texto_limpo = RE_LINHA_VALOR.replace(&texto_limpo, "");
    let texto_limpo = RE_LINHA_FUNDAMENTACAO.replace(&texto_limpo, "");
    let texto_limpo = RE_VAZIAS.replace_all(texto_limpo.trim(), "\n");

    if !texto_limpo.trim().is_empty() {
        return texto_limpo.trim().to_string();
    }

    // Last resort: everything after the title marker.
    let titulo = match kind {
        DocumentKind::Multa => &RE_TITULO_MULTA,
        DocumentKind::Advertencia => &RE_TITULO_ADVERTENCIA,
    };
    let mut partes = titulo.splitn(bloco, 2);
    let _ = partes.next();
    match partes.next() {
        Some(resto) if !resto.trim().is_empty() => normalizar_descricao(resto),
        _ => bloco.trim().to_string(),
    }
}

/// Trim a captured description and drop any trailing end-marker the
/// multi-line capture may have swallowed.
fn normalizar_descricao(captura: &str) -> String {
    captura.replace("FIM DOCUMENTO", "").trim().to_string()
}

fn extrair_fundamentacao(bloco: &str) -> Option<String> {
    if let Some(caps) = RE_FUNDAMENTACAO.captures(bloco) {
        return Some(normalizar_descricao(&caps[1]));
    }

    // No labeled field: take the first sentence with a legal citation.
    if RE_PALAVRAS_LEGAIS.is_match(bloco) {
        for frase in RE_FRASES.split(bloco) {
            if RE_PALAVRAS_LEGAIS.is_match(frase) {
                return Some(frase.trim().to_string());
            }
        }
    }
    None
}

fn formatar_exibicao(resposta: &str, kind: DocumentKind) -> String {
    let (titulo_original, titulo_formatado) = match kind {
        DocumentKind::Multa => (
            if resposta.contains("🔴 MULTA GERADA") {
                "🔴 MULTA GERADA"
            } else {
                "MULTA GERADA:"
            },
            "<strong class='text-danger'>🔴 MULTA GERADA</strong>",
        ),
        DocumentKind::Advertencia => (
            if resposta.contains("⚠️ ADVERTÊNCIA GERADA") {
                "⚠️ ADVERTÊNCIA GERADA"
            } else {
                "ADVERTÊNCIA GERADA:"
            },
            "<strong class='text-warning'>⚠️ ADVERTÊNCIA GERADA</strong>",
        ),
    };

    resposta
        .replacen(titulo_original, titulo_formatado, 1)
        .replacen("FIM DOCUMENTO", "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extrai_multa_completa() {
        let resposta = "MULTA GERADA\nData: 10/05/2024\nValor: R$ 200,00\nMotivo: Vaga ocupada indevidamente\nFIM DOCUMENTO";
        let processada = processar_resposta(resposta);

        let documento = processada.documento.expect("deveria detectar documento");
        assert_eq!(documento.kind, DocumentKind::Multa);
        assert_eq!(documento.data, "10/05/2024");
        assert_eq!(documento.valor.as_deref(), Some("200,00"));
        assert_eq!(documento.descricao, "Vaga ocupada indevidamente");
        assert!(!processada.texto_exibicao.contains("FIM DOCUMENTO"));
    }

    #[test]
    fn test_extrai_advertencia_sem_valor() {
        let resposta =
            "ADVERTÊNCIA GERADA\nData: 01/02/2024\nMotivo: Som alto na área da piscina\nFIM DOCUMENTO";
        let documento = processar_resposta(resposta).documento.unwrap();
        assert_eq!(documento.kind, DocumentKind::Advertencia);
        assert_eq!(documento.valor, None);
        assert_eq!(documento.descricao, "Som alto na área da piscina");
    }

    #[test]
    fn test_marcador_decorado_e_titulo_formatado() {
        let resposta = "🔴 MULTA GERADA\nValor: R$ 50,00\nMotivo: Lixo fora do horário";
        let processada = processar_resposta(resposta);
        assert_eq!(
            processada.documento.as_ref().unwrap().kind,
            DocumentKind::Multa
        );
        assert!(processada
            .texto_exibicao
            .starts_with("<strong class='text-danger'>🔴 MULTA GERADA</strong>"));
    }

    #[test]
    fn test_data_embutida_quando_sem_rotulo() {
        let resposta = "MULTA GERADA\nInfração registrada em 03/04/2024 na garagem.\nValor: R$ 80,00";
        let documento = processar_resposta(resposta).documento.unwrap();
        assert_eq!(documento.data, "03/04/2024");
    }

    #[test]
    fn test_valor_token_quando_sem_rotulo() {
        assert_eq!(extrair_valor_multa("o valor cobrado será R$ 75,50 neste mês"), "75,50");
        assert_eq!(extrair_valor_multa("nenhum número aqui"), "0,00");
    }

    #[test]
    fn test_descricao_sem_rotulos_usa_resto_do_bloco() {
        let resposta = "ADVERTÊNCIA GERADA\nData: 05/05/2024\nO morador deixou a porta da garagem aberta durante a noite.";
        let documento = processar_resposta(resposta).documento.unwrap();
        assert_eq!(
            documento.descricao,
            "O morador deixou a porta da garagem aberta durante a noite."
        );
    }

    #[test]
    fn test_fundamentacao_rotulada() {
        let resposta = "MULTA GERADA\nMotivo: Obra fora do horário\nFundamentação: Art. 19 do Regimento Interno";
        let documento = processar_resposta(resposta).documento.unwrap();
        assert_eq!(
            documento.fundamentacao.as_deref(),
            Some("Art. 19 do Regimento Interno")
        );
    }

    #[test]
    fn test_fundamentacao_por_sentenca_com_citacao() {
        let resposta = "ADVERTÊNCIA GERADA\nO condômino estacionou na área de circulação. De acordo com 7 do regimento é proibido estacionar nas áreas de circulação da garagem";
        let documento = processar_resposta(resposta).documento.unwrap();
        let fundamentacao = documento.fundamentacao.expect("frase legal detectada");
        assert!(fundamentacao.starts_with("De acordo com 7"));
        // The sentence already lives inside the description, so it is not
        // appended a second time.
        assert!(!documento.descricao.contains("Fundamentação:"));
    }

    #[test]
    fn test_resposta_comum_passa_sem_alteracao() {
        let resposta = "O horário da piscina é das 8h às 22h.";
        let processada = processar_resposta(resposta);
        assert!(processada.documento.is_none());
        assert_eq!(processada.texto_exibicao, resposta);
    }

    #[test]
    fn test_multa_prevalece_sobre_advertencia() {
        let resposta = "ADVERTÊNCIA GERADA convertida: MULTA GERADA\nValor: R$ 10,00\nMotivo: Reincidência";
        let documento = processar_resposta(resposta).documento.unwrap();
        assert_eq!(documento.kind, DocumentKind::Multa);
    }
}
