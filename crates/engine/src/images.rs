//! Collects the evidence image set for an image flow step.
//!
//! A batch that would exceed the step's limit is rejected whole; within an
//! accepted batch each file is validated individually, so one bad file does
//! not sink its siblings. Images can be removed again until the set is
//! confirmed.

use services::upload::{formatar_tamanho, formato_suportado, tamanho_permitido, ImagemLocal};
use shared::error::AssistError;
use tracing::warn;

/// Result of offering a batch of files to the collector.
#[derive(Debug, Default)]
pub struct AdicaoImagens {
    pub aceitas: usize,
    /// One warning per individually rejected file.
    pub recusadas: Vec<String>,
}

pub struct ImageSetCollector {
    maximo: usize,
    selecionadas: Vec<ImagemLocal>,
}

impl ImageSetCollector {
    pub fn new(maximo: usize) -> Self {
        Self {
            maximo,
            selecionadas: Vec::new(),
        }
    }

    pub fn maximo(&self) -> usize {
        self.maximo
    }

    /// Add a batch. The whole batch is refused when it would overflow the
    /// limit; otherwise invalid files are skipped with a warning each.
    pub fn adicionar(&mut self, batch: Vec<ImagemLocal>) -> Result<AdicaoImagens, AssistError> {
        if self.selecionadas.len() + batch.len() > self.maximo {
            return Err(AssistError::validation(format!(
                "Você pode selecionar no máximo {} imagens",
                self.maximo
            )));
        }

        let mut resultado = AdicaoImagens::default();
        for imagem in batch {
            if !formato_suportado(&imagem.nome) {
                warn!(nome = %imagem.nome, "unsupported image format");
                resultado.recusadas.push(format!(
                    "Formato não suportado: {}. Use apenas JPG, PNG ou JPEG.",
                    imagem.nome
                ));
                continue;
            }
            if !tamanho_permitido(imagem.tamanho) {
                warn!(nome = %imagem.nome, tamanho = imagem.tamanho, "image too large");
                resultado.recusadas.push(format!(
                    "Arquivo muito grande: {} ({}). Máximo 5MB por imagem.",
                    imagem.nome,
                    formatar_tamanho(imagem.tamanho)
                ));
                continue;
            }
            self.selecionadas.push(imagem);
            resultado.aceitas += 1;
        }

        Ok(resultado)
    }

    pub fn remover(&mut self, indice: usize) -> Result<ImagemLocal, AssistError> {
        if indice >= self.selecionadas.len() {
            return Err(AssistError::validation(format!(
                "não há imagem na posição {}",
                indice + 1
            )));
        }
        Ok(self.selecionadas.remove(indice))
    }

    pub fn selecionadas(&self) -> &[ImagemLocal] {
        &self.selecionadas
    }

    pub fn len(&self) -> usize {
        self.selecionadas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selecionadas.is_empty()
    }

    /// Hand the set over for upload, leaving the collector empty.
    pub fn tomar(&mut self) -> Vec<ImagemLocal> {
        std::mem::take(&mut self.selecionadas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn imagem(nome: &str, tamanho: u64) -> ImagemLocal {
        ImagemLocal {
            caminho: PathBuf::from(format!("/tmp/{}", nome)),
            nome: nome.to_string(),
            tamanho,
        }
    }

    #[test]
    fn test_lote_acima_do_limite_rejeitado_inteiro() {
        let mut collector = ImageSetCollector::new(3);
        let lote = vec![
            imagem("a.jpg", 100),
            imagem("b.jpg", 100),
            imagem("c.jpg", 100),
            imagem("d.jpg", 100),
        ];

        let resultado = collector.adicionar(lote);
        assert!(matches!(resultado, Err(AssistError::Validation(_))));
        // No partial acceptance of the first three.
        assert!(collector.is_empty());
    }

    #[test]
    fn test_arquivo_invalido_rejeitado_individualmente() {
        let mut collector = ImageSetCollector::new(3);
        let lote = vec![
            imagem("boa.jpg", 100),
            imagem("documento.pdf", 100),
            imagem("grande.png", 6 * 1024 * 1024),
        ];

        let resultado = collector.adicionar(lote).unwrap();
        assert_eq!(resultado.aceitas, 1);
        assert_eq!(resultado.recusadas.len(), 2);
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.selecionadas()[0].nome, "boa.jpg");
    }

    #[test]
    fn test_limite_considera_ja_selecionadas() {
        let mut collector = ImageSetCollector::new(3);
        collector
            .adicionar(vec![imagem("a.jpg", 1), imagem("b.jpg", 1)])
            .unwrap();

        let resultado = collector.adicionar(vec![imagem("c.jpg", 1), imagem("d.jpg", 1)]);
        assert!(resultado.is_err());
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_remover_e_readicionar() {
        let mut collector = ImageSetCollector::new(2);
        collector
            .adicionar(vec![imagem("a.jpg", 1), imagem("b.jpg", 1)])
            .unwrap();

        let removida = collector.remover(0).unwrap();
        assert_eq!(removida.nome, "a.jpg");
        assert_eq!(collector.len(), 1);

        collector.adicionar(vec![imagem("c.jpg", 1)]).unwrap();
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_remover_indice_invalido() {
        let mut collector = ImageSetCollector::new(2);
        assert!(collector.remover(0).is_err());
    }
}
