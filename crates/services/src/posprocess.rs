//! Deterministic cleanup of generated document text.
//!
//! Every stage is a pure text → text function; the whole pipeline is
//! idempotent, so re-running it over its own output changes nothing. The
//! header dedup stage assumes the document shape produced by
//! [`crate::prompt`] — the organization line, the document title and a
//! horizontal rule, followed by a body opening with "Prezado".

use regex::Regex;
use shared::documento::DocumentKind;
use std::sync::LazyLock;

/// Bracketed retrieval-citation artifacts such as 【4:0†CONVENÇÃO.pdf】.
static RE_MARCADOR_CITACAO: LazyLock<Regex> = LazyLock::new(|| Regex::new("【[^】]*】").unwrap());

static RE_NEGRITO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*+(.*?)\*+").unwrap());

/// Art. 10 mis-attributed to the internal rules; it belongs to federal law.
static RE_ATRIBUICAO_ART10: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)De acordo com o Regimento Interno, Art\. 10[^.]+ - É defeso a qualquer condômino")
        .unwrap()
});

static RE_MARCADOR_FOTO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[FOTO\(S\)\]|\[FOTO\]|\[FOTOS\]").unwrap());

static RE_MARCADOR_VERIFICAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[VERIFICAR ARTIGO APLICÁVEL\]|\[VERIFICAR ARTIGO\]|\[ARTIGO APLICÁVEL\]")
        .unwrap()
});

static RE_LINHAS_VAZIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").unwrap());

static RE_LINHA_HORIZONTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-_]{3,}$").unwrap());

const CABECALHO_CONDOMINIO: &str = "CONDOMÍNIO";

/// Strip retrieval-citation markers from a raw assistant reply, preserving
/// everything else.
pub fn limpar_resposta(resposta: &str) -> String {
    RE_MARCADOR_CITACAO.replace_all(resposta, "").trim().to_string()
}

/// Convert `*bold*` runs to HTML bold for chat display.
pub fn destacar_negrito(texto: &str) -> String {
    RE_NEGRITO.replace_all(texto, "<b>$1</b>").to_string()
}

/// Full post-processing pipeline over a cleaned document body.
pub fn pos_processar(documento: &str, kind: DocumentKind) -> String {
    let documento = RE_ATRIBUICAO_ART10.replace_all(
        documento,
        "De acordo com a Lei de Condomínio nº 4.591/64, Art. 10 - É defeso a qualquer condômino",
    );

    let documento = RE_MARCADOR_FOTO.replace_all(&documento, "");
    let documento =
        RE_MARCADOR_VERIFICAR.replace_all(&documento, "Art. aplicável do regulamento");

    let documento = RE_LINHAS_VAZIAS.replace_all(&documento, "\n\n");

    let linhas_processadas = remover_cabecalhos_repetidos(&documento, kind.titulo());

    colapsar_linhas_vazias(&linhas_processadas)
}

/// Walk the document top to bottom, keeping only the first occurrence of the
/// organization line, the title line and the horizontal rule. Once all three
/// were seen and a "Prezado" line appears, everything after is body text and
/// further organization/title lines are dropped.
fn remover_cabecalhos_repetidos(documento: &str, titulo_principal: &str) -> Vec<String> {
    let mut linhas_processadas: Vec<String> = Vec::new();

    let mut encontrou_condominio = false;
    let mut encontrou_titulo = false;
    let mut encontrou_linha = false;
    let mut dentro_do_corpo = false;

    for linha in documento.split('\n') {
        let linha_limpa = linha.trim();

        // Skip blank lines made consecutive by the marker removals above.
        if linha_limpa.is_empty()
            && linhas_processadas
                .last()
                .is_some_and(|anterior| anterior.trim().is_empty())
        {
            continue;
        }

        if !dentro_do_corpo {
            if encontrou_condominio
                && encontrou_titulo
                && encontrou_linha
                && linha_limpa.starts_with("Prezado")
            {
                dentro_do_corpo = true;
                linhas_processadas.push(linha.to_string());
                continue;
            }

            if linha_limpa == CABECALHO_CONDOMINIO {
                if !encontrou_condominio {
                    encontrou_condominio = true;
                    linhas_processadas.push(linha.to_string());
                }
                continue;
            }

            if linha_limpa == titulo_principal {
                if !encontrou_titulo {
                    encontrou_titulo = true;
                    linhas_processadas.push(linha.to_string());
                }
                continue;
            }

            if RE_LINHA_HORIZONTAL.is_match(linha_limpa) {
                if !encontrou_linha {
                    encontrou_linha = true;
                    linhas_processadas.push(linha.to_string());
                }
                continue;
            }

            linhas_processadas.push(linha.to_string());
        } else {
            if linha_limpa == CABECALHO_CONDOMINIO || linha_limpa == titulo_principal {
                continue;
            }
            linhas_processadas.push(linha.to_string());
        }
    }

    linhas_processadas
}

fn colapsar_linhas_vazias(linhas: &[String]) -> String {
    let mut resultado: Vec<&str> = Vec::with_capacity(linhas.len());
    let mut ultima_linha_vazia = false;

    for linha in linhas {
        if linha.trim().is_empty() {
            if !ultima_linha_vazia {
                resultado.push(linha);
                ultima_linha_vazia = true;
            }
        } else {
            resultado.push(linha);
            ultima_linha_vazia = false;
        }
    }

    resultado.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limpar_resposta_remove_todos_marcadores() {
        let entrada = "Prezado 【4:0†00388 - CONVENÇÃO.pdf】Sr./Sra.,\ntexto【1:2†doc】 final";
        let saida = limpar_resposta(entrada);
        assert_eq!(saida, "Prezado Sr./Sra.,\ntexto final");
        assert!(!saida.contains('【'));
        assert!(!saida.contains('】'));
    }

    #[test]
    fn test_limpar_resposta_preserva_texto_sem_marcadores() {
        let entrada = "Nada a remover aqui.";
        assert_eq!(limpar_resposta(entrada), entrada);
    }

    #[test]
    fn test_destacar_negrito() {
        assert_eq!(destacar_negrito("isso é **importante** ok"), "isso é <b>importante</b> ok");
        assert_eq!(destacar_negrito("*simples*"), "<b>simples</b>");
    }

    #[test]
    fn test_corrige_atribuicao_art_10() {
        let entrada = "De acordo com o Regimento Interno, Art. 10, inciso III - É defeso a qualquer condômino usar a unidade de forma nociva.";
        let saida = pos_processar(entrada, DocumentKind::Advertencia);
        assert!(saida.starts_with(
            "De acordo com a Lei de Condomínio nº 4.591/64, Art. 10 - É defeso a qualquer condômino"
        ));
        assert!(!saida.contains("Regimento Interno, Art. 10"));
    }

    #[test]
    fn test_remove_marcadores_de_foto() {
        let entrada = "Segue o registro.\n\n[FOTO(S)]\n\nAtenciosamente.";
        let saida = pos_processar(entrada, DocumentKind::Advertencia);
        assert!(!saida.to_lowercase().contains("[foto"));
    }

    #[test]
    fn test_substitui_marcador_de_verificacao() {
        let entrada = "Conforme [VERIFICAR ARTIGO APLICÁVEL] do regimento.";
        let saida = pos_processar(entrada, DocumentKind::Multa);
        assert_eq!(saida, "Conforme Art. aplicável do regulamento do regimento.");
    }

    #[test]
    fn test_colapsa_linhas_vazias_em_excesso() {
        let entrada = "primeira\n\n\n\n\nsegunda";
        let saida = pos_processar(entrada, DocumentKind::Advertencia);
        assert_eq!(saida, "primeira\n\nsegunda");
    }

    fn documento_com_cabecalhos_repetidos() -> String {
        [
            "CONDOMÍNIO",
            "ADVERTÊNCIA",
            "---",
            "CONDOMÍNIO",
            "ADVERTÊNCIA",
            "Prezado Sr./Sra. João,",
            "",
            "ADVERTÊNCIA",
            "Texto do corpo sobre a ocorrência.",
            "CONDOMÍNIO",
            "",
            "Atenciosamente.",
        ]
        .join("\n")
    }

    #[test]
    fn test_dedup_de_cabecalhos() {
        let saida = pos_processar(&documento_com_cabecalhos_repetidos(), DocumentKind::Advertencia);

        let condominio = saida.matches("CONDOMÍNIO").count();
        let titulo = saida
            .lines()
            .filter(|l| l.trim() == "ADVERTÊNCIA")
            .count();
        assert_eq!(condominio, 1);
        assert_eq!(titulo, 1);
        assert!(saida.contains("Prezado Sr./Sra. João,"));
        assert!(saida.contains("Texto do corpo sobre a ocorrência."));
    }

    #[test]
    fn test_titulo_de_multa_nao_confunde_advertencia() {
        let entrada = "NOTIFICAÇÃO DE MULTA\nNOTIFICAÇÃO DE MULTA\ncorpo";
        let saida = pos_processar(entrada, DocumentKind::Multa);
        assert_eq!(
            saida
                .lines()
                .filter(|l| l.trim() == "NOTIFICAÇÃO DE MULTA")
                .count(),
            1
        );
    }

    #[test]
    fn test_pos_processar_idempotente() {
        let entrada = format!(
            "{}\n\n\n\n[FOTO]\nDe acordo com o Regimento Interno, Art. 10, I - É defeso a qualquer condômino alterar a fachada.",
            documento_com_cabecalhos_repetidos()
        );
        let uma_vez = pos_processar(&entrada, DocumentKind::Advertencia);
        let duas_vezes = pos_processar(&uma_vez, DocumentKind::Advertencia);
        assert_eq!(uma_vez, duas_vezes);
    }
}
