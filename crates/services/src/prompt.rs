//! Prompt composition for document generation.
//!
//! The instruction text is deliberately long: it pins down the exact
//! structure of the generated body (salutation, incident paragraph, the
//! blank line reserved for photographic evidence, the legal citation with
//! source disambiguation, closing) and forbids placeholder artifacts. The
//! post-processor in [`crate::posprocess`] assumes this shape — changing one
//! requires changing the other.

use regex::Regex;
use shared::documento::{DocumentKind, Ocorrencia};
use std::sync::LazyLock;

static RE_DATA_BR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{2,4}$").unwrap());
static RE_DATA_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").unwrap());
static RE_DATA_TRACO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}-\d{1,2}-\d{4}$").unwrap());

/// Reformat a collected date to the Brazilian convention. Dates already in
/// DD/MM/YYYY pass through; anything unrecognized is returned unchanged.
pub fn formatar_data(data: &str) -> String {
    let data = data.trim();

    if RE_DATA_BR.is_match(data) {
        return data.to_string();
    }
    if RE_DATA_ISO.is_match(data) {
        let partes: Vec<&str> = data.split('-').collect();
        return format!("{}/{}/{}", partes[2], partes[1], partes[0]);
    }
    if RE_DATA_TRACO.is_match(data) {
        let partes: Vec<&str> = data.split('-').collect();
        return format!("{}/{}/{}", partes[0], partes[1], partes[2]);
    }

    data.to_string()
}

/// Fine amount with two decimals and a comma separator ("150,00").
pub fn formatar_valor(valor: f64) -> String {
    format!("{:.2}", valor).replace('.', ",")
}

/// Shared reference block teaching the model to attribute articles to the
/// correct legal source.
const REFERENCIAS_ARTIGOS: &str = "\
REFERÊNCIAS PARA IDENTIFICAÇÃO CORRETA DOS ARTIGOS:

a) Lei de Condomínio nº 4.591/64 (lei federal que regulamenta condomínios):
   - Art. 10 - É defeso a qualquer condômino: I - alterar a forma externa da fachada; II - decorar as partes e esquadriais externas com tonalidades ou côres diversas das empregadas no conjunto da edificação; III - destinar a unidade a utilização diversa de finalidade do prédio, ou usá-la de forma nociva ou perigosa ao sossêgo, à salubridade e à segurança dos demais condôminos; IV - embaraçar o uso das partes comuns.
   - Art. 19 - Cada condômino tem o direito de usar e fruir, com exclusividade, de sua unidade autônoma, segundo suas conveniências e interêsses, condicionados, umas e outros às normas de boa vizinhança, e poderá usar as partes e coisas comuns de maneira a não causar dano ou incômodo aos demais condôminos ou moradores, nem obstáculo ou embaraço ao bom uso das mesmas partes por todos.

b) Convenção do Condomínio (documento específico elaborado e registrado para este condomínio):
   - Geralmente contém regras sobre assembleias, administração, sanções, etc.
   - Exemplo: \"Art. 15 - As unidades destinam-se exclusivamente para fins residenciais.\"

c) Regimento Interno (normas de convivência do dia a dia no condomínio):
   - Regras mais específicas sobre uso de áreas comuns, barulho, obras, etc.
   - Exemplo: \"Art. 7º - É proibido estacionar nas áreas de circulação da garagem.\"
   - Exemplo: \"Art. 12º - É vedado o trânsito de animais nas áreas comuns do condomínio, salvo autorização especial.\"

IMPORTANTE: O Art. 10 e seus incisos que falam sobre \"É defeso a qualquer condômino\" pertencem SEMPRE à Lei de Condomínio nº 4.591/64, NUNCA ao Regimento Interno.";

const ATENCAO_CITACAO: &str = "\
ATENÇÃO - EXTREMAMENTE IMPORTANTE SOBRE A CITAÇÃO DO ARTIGO:
- Você DEVE reproduzir LITERALMENTE o texto do artigo, mantendo EXATAMENTE a mesma numeração, letras, parênteses e formatação do original
- NÃO altere, resuma ou reinterprete o texto do artigo sob hipótese alguma
- Preste especial atenção à numeração dos artigos (Art. 1°, Art. 2°, etc.) e à identificação das alíneas (a-, b-, c-, d-, etc.)
- Verifique duas vezes se está citando o artigo e alínea CORRETOS que se aplicam à infração específica
- NUNCA inclua frases como [VERIFICAR ARTIGO APLICÁVEL] no documento final
- Se não tiver certeza absoluta sobre qual artigo específico aplicar, utilize uma redação mais genérica, como: \"De acordo com o Regimento Interno, é vedado o trânsito de animais nas áreas comuns do condomínio, salvo autorização especial, e recomenda-se o uso de coleira e focinheira, quando necessário, para a segurança do animal e dos condôminos.\"";

const EXEMPLO_ADVERTENCIA: &str = "\
Siga EXATAMENTE este exemplo de formatação:

\"Prezado Sr./Sra. [Nome],

Informamos que foi constatado o uso de furadeira em sua unidade na data [data do ocorrido], o que resultou em incômodo para os demais moradores do condomínio. Essa atividade está sujeita a regulamentação específica.

De acordo com o Regimento Interno, Art. 19º - A troca ou raspagem de pisos, assoalhos, utilização de furadeiras elétricas e demais serviços de obras nos apartamentos que produzam ruídos suscetíveis a incomodar os condôminos, fora do seguinte horário: dias úteis de 2ª à 6ª feira, das 08:00 às 18:00 horas e aos sábados, das 08:00 às 13:00 horas, sendo proibido aos domingos e feriados.

Alertamos que, em caso de reincidência, serão aplicadas sanções, incluindo multas conforme previsto no regulamento interno. Agradecemos a sua compreensão e colaboração para manter um ambiente harmonioso para todos.

Atenciosamente.\"";

fn identificacao_condomino(ocorrencia: &Ocorrencia) -> String {
    let bloco = ocorrencia
        .morador
        .bloco
        .as_deref()
        .map(|b| format!("do Bloco {}, ", b))
        .unwrap_or_default();
    format!(
        "o condômino {}, {}da unidade {}",
        ocorrencia.morador.nome, bloco, ocorrencia.morador.apartamento
    )
}

/// Full instruction prompt for the primary (assistant) generation path.
pub fn montar_prompt(kind: DocumentKind, ocorrencia: &Ocorrencia) -> String {
    match kind {
        DocumentKind::Advertencia => montar_prompt_advertencia(ocorrencia),
        DocumentKind::Multa => montar_prompt_multa(ocorrencia),
    }
}

fn montar_prompt_advertencia(ocorrencia: &Ocorrencia) -> String {
    format!(
        "Elabore APENAS o corpo do texto de uma advertência para {quem}, referente à ocorrência de {data}: {descricao}

IMPORTANTE: Forneça APENAS o texto principal da advertência que começa com \"Prezado Sr./Sra.\" e termina antes das assinaturas.

O texto deve seguir EXATAMENTE este formato:

1. Iniciar com \"Prezado Sr./Sra. [Nome],\"
2. Um parágrafo breve informando sobre a ocorrência e que a atividade está sujeita a regulamentação específica
3. Incluir uma linha em branco onde as evidências fotográficas serão inseridas posteriormente
4. ANTES de elaborar o documento, você deve se perguntar: \"De qual documento específico estou obtendo este artigo?\" Identifique CLARAMENTE a fonte usando as referências a seguir.

{referencias}

5. Após identificar a fonte correta, cite o artigo completo precedido pela fonte exata
6. Após o artigo, um breve parágrafo sobre as consequências de reincidência
7. Encerrar com \"Atenciosamente.\"

{atencao}

{exemplo}

IMPORTANTE: NÃO inclua o marcador '[FOTO(S)]' no texto - deixe apenas um espaço em branco onde as fotos seriam inseridas.",
        quem = identificacao_condomino(ocorrencia),
        data = formatar_data(&ocorrencia.data),
        descricao = ocorrencia.descricao,
        referencias = REFERENCIAS_ARTIGOS,
        atencao = ATENCAO_CITACAO,
        exemplo = EXEMPLO_ADVERTENCIA,
    )
}

fn montar_prompt_multa(ocorrencia: &Ocorrencia) -> String {
    format!(
        "Elabore APENAS o corpo do texto de uma multa no valor de R$ {valor} para {quem}, referente à ocorrência de {data}: {descricao}

IMPORTANTE: Forneça APENAS o texto principal da multa que começa com \"Prezado Sr./Sra.\" e termina antes das assinaturas.

O texto deve seguir esta estrutura:

1. Iniciar com \"Prezado Sr./Sra. [Nome],\"
2. Descrever claramente a infração cometida, incluindo a data e detalhes do ocorrido
3. Incluir uma linha em branco onde as evidências fotográficas serão inseridas posteriormente
4. ANTES de elaborar o documento, você deve se perguntar: \"De qual documento específico estou obtendo este artigo?\" Identifique CLARAMENTE a fonte usando as referências a seguir.

{referencias}

5. Após identificar a fonte correta, cite o artigo completo precedido pela fonte exata
6. Informar sobre o valor da multa aplicada e o prazo para pagamento
7. Explicar as consequências em caso de não pagamento
8. Encerrar com uma frase cordial
9. A unidade e o bloco informados identificam a unidade do condômino, mas não devem ser citados no texto.

NÃO inclua cabeçalho, rodapé, espaços para assinatura ou formatação adicional. Forneça SOMENTE o texto principal.

IMPORTANTE: NUNCA inclua frases como [VERIFICAR ARTIGO APLICÁVEL] no documento final. NÃO inclua o marcador '[FOTO(S)]' no texto - deixe apenas um espaço em branco onde as fotos seriam inseridas.",
        valor = formatar_valor(ocorrencia.valor.unwrap_or(0.0)),
        quem = identificacao_condomino(ocorrencia),
        data = formatar_data(&ocorrencia.data),
        descricao = ocorrencia.descricao,
        referencias = REFERENCIAS_ARTIGOS,
    )
}

/// System instruction for the stateless completion fallback, reiterating the
/// same formatting contract against the condominium's own rules.
pub fn instrucao_sistema_fallback(condominio_nome: &str, kind: DocumentKind) -> String {
    format!(
        "Você é um especialista em elaborar documentos formais para o {nome}. \
Com base na descrição da ocorrência, sua tarefa é identificar a regra ESPECÍFICA do regimento interno deste condomínio que foi violada \
e elaborar um documento formal de {tipo} seguindo a estrutura \
oficial dos documentos de condomínio. NÃO use artigos genéricos como \"Art. 58º\" ou outros, \
apenas cite artigos que existem realmente no regimento interno deste condomínio específico.",
        nome = condominio_nome,
        tipo = match kind {
            DocumentKind::Advertencia => "advertência",
            DocumentKind::Multa => "multa",
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::documento::Morador;

    fn ocorrencia(kind: DocumentKind) -> Ocorrencia {
        Ocorrencia {
            data: "2024-03-15".into(),
            valor: matches!(kind, DocumentKind::Multa).then_some(150.0),
            descricao: "Barulho excessivo após 22h".into(),
            morador: Morador {
                nome: "João da Silva".into(),
                apartamento: "302".into(),
                bloco: Some("B".into()),
            },
            external_assistant_id: Some("asst_123".into()),
        }
    }

    #[test]
    fn test_formatar_data_iso_para_br() {
        assert_eq!(formatar_data("2024-03-15"), "15/03/2024");
    }

    #[test]
    fn test_formatar_data_br_passa_direto() {
        assert_eq!(formatar_data(" 15/03/2024 "), "15/03/2024");
        assert_eq!(formatar_data("1/3/24"), "1/3/24");
    }

    #[test]
    fn test_formatar_data_traco_brasileiro() {
        assert_eq!(formatar_data("15-03-2024"), "15/03/2024");
    }

    #[test]
    fn test_formatar_data_invalida_inalterada() {
        assert_eq!(formatar_data("ontem à noite"), "ontem à noite");
    }

    #[test]
    fn test_formatar_valor_duas_casas_com_virgula() {
        assert_eq!(formatar_valor(150.0), "150,00");
        assert_eq!(formatar_valor(99.9), "99,90");
        assert_eq!(formatar_valor(1234.567), "1234,57");
    }

    #[test]
    fn test_prompt_advertencia_embute_dados() {
        let prompt = montar_prompt(DocumentKind::Advertencia, &ocorrencia(DocumentKind::Advertencia));
        assert!(prompt.contains("o condômino João da Silva, do Bloco B, da unidade 302"));
        assert!(prompt.contains("15/03/2024"));
        assert!(prompt.contains("Barulho excessivo após 22h"));
        assert!(prompt.contains("Lei de Condomínio nº 4.591/64"));
        assert!(prompt.contains("NUNCA inclua frases como [VERIFICAR ARTIGO APLICÁVEL]"));
    }

    #[test]
    fn test_prompt_multa_embute_valor_formatado() {
        let prompt = montar_prompt(DocumentKind::Multa, &ocorrencia(DocumentKind::Multa));
        assert!(prompt.contains("multa no valor de R$ 150,00"));
        assert!(prompt.contains("prazo para pagamento"));
    }

    #[test]
    fn test_prompt_sem_bloco_omite_trecho() {
        let mut ocorrencia = ocorrencia(DocumentKind::Advertencia);
        ocorrencia.morador.bloco = None;
        let prompt = montar_prompt(DocumentKind::Advertencia, &ocorrencia);
        assert!(!prompt.contains("do Bloco"));
        assert!(prompt.contains("o condômino João da Silva, da unidade 302"));
    }

    #[test]
    fn test_instrucao_fallback_nomeia_condominio() {
        let instrucao = instrucao_sistema_fallback("Residencial Aurora", DocumentKind::Multa);
        assert!(instrucao.contains("Residencial Aurora"));
        assert!(instrucao.contains("documento formal de multa"));
    }
}
