//! Detects the intent to issue an infraction document from a free-text chat
//! message.
//!
//! Plain ordered pattern matching: every advertência phrasing is tried
//! before any multa phrasing, so a message that could read both ways
//! resolves to the warning. The trigger phrasings are data, not contract —
//! custom sets can be supplied with [`IntentDetector::with_patterns`].

use regex::Regex;
use shared::documento::DocumentKind;
use std::sync::LazyLock;

const ADVERTENCIA_PATTERNS: &[&str] = &[
    r"gera\w*\s+(?:uma\s+)?advertência",
    r"cria\w*\s+(?:uma\s+)?advertência",
    r"emiti\w*\s+(?:uma\s+)?advertência",
    r"preciso\s+(?:de\s+)?(?:uma\s+)?advertência",
    r"quero\s+(?:fazer|criar|gerar)\s+(?:uma\s+)?advertência",
    r"advertir\s+(?:o|a)\s+",
];

const MULTA_PATTERNS: &[&str] = &[
    r"gera\w*\s+(?:uma\s+)?multa",
    r"cria\w*\s+(?:uma\s+)?multa",
    r"emiti\w*\s+(?:uma\s+)?multa",
    r"preciso\s+(?:de\s+)?(?:uma\s+)?multa",
    r"quero\s+(?:fazer|criar|gerar)\s+(?:uma\s+)?multa",
    r"aplicar\s+(?:uma\s+)?multa",
];

static DEFAULT_DETECTOR: LazyLock<IntentDetector> = LazyLock::new(IntentDetector::default);

pub struct IntentDetector {
    advertencia: Vec<Regex>,
    multa: Vec<Regex>,
}

impl IntentDetector {
    /// Build a detector from custom pattern sets. Patterns are matched
    /// case-insensitively against the whole message.
    pub fn with_patterns(advertencia: &[&str], multa: &[&str]) -> Result<Self, regex::Error> {
        let compile = |sources: &[&str]| -> Result<Vec<Regex>, regex::Error> {
            sources
                .iter()
                .map(|source| Regex::new(&format!("(?i){}", source)))
                .collect()
        };
        Ok(Self {
            advertencia: compile(advertencia)?,
            multa: compile(multa)?,
        })
    }

    /// First matching kind, advertência patterns first. No side effects.
    pub fn detect(&self, mensagem: &str) -> Option<DocumentKind> {
        let mensagem = mensagem.to_lowercase();

        if self.advertencia.iter().any(|p| p.is_match(&mensagem)) {
            return Some(DocumentKind::Advertencia);
        }
        if self.multa.iter().any(|p| p.is_match(&mensagem)) {
            return Some(DocumentKind::Multa);
        }
        None
    }
}

impl Default for IntentDetector {
    fn default() -> Self {
        // The built-in pattern lists are known-good literals.
        Self::with_patterns(ADVERTENCIA_PATTERNS, MULTA_PATTERNS)
            .expect("built-in intent patterns must compile")
    }
}

/// Detect with the built-in phrasings.
pub fn detectar_intencao(mensagem: &str) -> Option<DocumentKind> {
    DEFAULT_DETECTOR.detect(mensagem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_multa_phrasings() {
        assert_eq!(
            detectar_intencao("quero gerar uma multa"),
            Some(DocumentKind::Multa)
        );
        assert_eq!(
            detectar_intencao("pode aplicar multa para o 302?"),
            Some(DocumentKind::Multa)
        );
        assert_eq!(
            detectar_intencao("Preciso de uma multa urgente"),
            Some(DocumentKind::Multa)
        );
    }

    #[test]
    fn test_detects_advertencia_phrasings() {
        assert_eq!(
            detectar_intencao("Gerar advertência para o morador"),
            Some(DocumentKind::Advertencia)
        );
        assert_eq!(
            detectar_intencao("gostaria de advertir o condômino do 101"),
            Some(DocumentKind::Advertencia)
        );
        assert_eq!(
            detectar_intencao("crie uma advertência"),
            Some(DocumentKind::Advertencia)
        );
    }

    #[test]
    fn test_advertencia_takes_priority_over_multa() {
        // Matches phrasings from both lists; warning wins by evaluation order.
        assert_eq!(
            detectar_intencao("quero gerar advertência ou aplicar multa"),
            Some(DocumentKind::Advertencia)
        );
    }

    #[test]
    fn test_plain_chat_has_no_intent() {
        assert_eq!(detectar_intencao("qual o horário da piscina?"), None);
        assert_eq!(detectar_intencao("a multa do mês passado foi paga?"), None);
    }

    #[test]
    fn test_custom_patterns() {
        let detector = IntentDetector::with_patterns(&[r"notifica\w*"], &[r"penaliza\w*"]).unwrap();
        assert_eq!(
            detector.detect("notificar o apartamento 12"),
            Some(DocumentKind::Advertencia)
        );
        assert_eq!(
            detector.detect("penalizar o apartamento 12"),
            Some(DocumentKind::Multa)
        );
        assert_eq!(detector.detect("gerar multa"), None);
    }
}
