//! Guided flow engine: a fixed-step wizard that collects the data needed to
//! generate one infraction document.
//!
//! The session is an explicit state machine owned by the chat view: `Idle`
//! until an intent starts a flow, then awaiting one step at a time. Each
//! valid answer stores exactly one field and advances; invalid answers
//! re-prompt without advancing. Completing the last step renders the summary,
//! hands the collected map back for dispatch and resets to `Idle`
//! immediately — the engine never waits for generation to settle.

use crate::images::{AdicaoImagens, ImageSetCollector};
use serde_json::{Map, Value};
use services::upload::{ImageUploader, ImagemLocal};
use shared::documento::DocumentKind;
use shared::error::AssistError;
use tracing::info;
use uuid::Uuid;

pub const VALOR_NAO_INFORMADO: &str = "Não informado";

/// Extra guidance shown right after a flow starts, before the first step.
pub const MENSAGEM_FUNDAMENTACAO: &str = "Antes de prosseguirmos, é importante ter uma fundamentação legal adequada para este documento.

Se possível, forneça:
1) A referência específica do regulamento (artigo, cláusula, inciso)
2) Qual parte do documento trata do ocorrido
3) Se houver, a penalidade prevista para este tipo de situação

Estas informações ajudarão a gerar um documento mais preciso e efetivo.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Data,
    Texto,
    Numero,
    Imagens { maximo: usize },
}

#[derive(Debug)]
pub struct FlowStep {
    pub pergunta: &'static str,
    pub campo: &'static str,
    pub kind: StepKind,
}

#[derive(Debug)]
pub struct FlowDefinition {
    pub kind: DocumentKind,
    pub nome: &'static str,
    pub passos: &'static [FlowStep],
}

const PASSOS_ADVERTENCIA: &[FlowStep] = &[
    FlowStep {
        pergunta: "Qual a data do incidente?",
        campo: "data",
        kind: StepKind::Data,
    },
    FlowStep {
        pergunta: "Descreva o incidente detalhadamente:",
        campo: "descricao",
        kind: StepKind::Texto,
    },
    FlowStep {
        pergunta: "Envie até 3 imagens que comprovem o incidente (JPG, PNG ou JPEG - máximo 5MB cada):",
        campo: "imagens",
        kind: StepKind::Imagens { maximo: 3 },
    },
];

const PASSOS_MULTA: &[FlowStep] = &[
    FlowStep {
        pergunta: "Qual a data da infração?",
        campo: "data",
        kind: StepKind::Data,
    },
    FlowStep {
        pergunta: "Qual o valor da multa?",
        campo: "valor",
        kind: StepKind::Numero,
    },
    FlowStep {
        pergunta: "Descreva a infração cometida:",
        campo: "descricao",
        kind: StepKind::Texto,
    },
    FlowStep {
        pergunta: "Envie até 3 imagens que comprovem a infração (JPG, PNG ou JPEG - máximo 5MB cada):",
        campo: "imagens",
        kind: StepKind::Imagens { maximo: 3 },
    },
];

static FLUXO_ADVERTENCIA: FlowDefinition = FlowDefinition {
    kind: DocumentKind::Advertencia,
    nome: "Advertência",
    passos: PASSOS_ADVERTENCIA,
};

static FLUXO_MULTA: FlowDefinition = FlowDefinition {
    kind: DocumentKind::Multa,
    nome: "Multa",
    passos: PASSOS_MULTA,
};

pub fn definicao(kind: DocumentKind) -> &'static FlowDefinition {
    match kind {
        DocumentKind::Advertencia => &FLUXO_ADVERTENCIA,
        DocumentKind::Multa => &FLUXO_MULTA,
    }
}

/// Prompt the view must present for the current step.
#[derive(Debug, Clone, Copy)]
pub struct StepPrompt {
    pub pergunta: &'static str,
    pub kind: StepKind,
}

/// Everything the view shows when a flow starts.
#[derive(Debug)]
pub struct FlowStart {
    pub mensagens: Vec<String>,
    pub primeiro_passo: StepPrompt,
}

/// Data handed back when the final step completes. The session is already
/// reset when this value is returned.
#[derive(Debug)]
pub struct FlowOutcome {
    pub kind: DocumentKind,
    pub resumo: String,
    pub dados: Map<String, Value>,
}

#[derive(Debug)]
pub enum FlowProgress {
    Proximo(StepPrompt),
    Concluido(FlowOutcome),
}

struct Coleta {
    definicao: &'static FlowDefinition,
    passo: usize,
    dados: Map<String, Value>,
    coletor: Option<ImageSetCollector>,
}

enum Estado {
    Idle,
    Coletando(Coleta),
}

pub struct FlowSession {
    estado: Estado,
}

impl FlowSession {
    pub fn new() -> Self {
        Self { estado: Estado::Idle }
    }

    pub fn ativo(&self) -> bool {
        matches!(self.estado, Estado::Coletando(_))
    }

    pub fn passo_atual(&self) -> Option<&'static FlowStep> {
        match &self.estado {
            Estado::Coletando(coleta) => coleta.definicao.passos.get(coleta.passo),
            Estado::Idle => None,
        }
    }

    /// Begin collecting for one document kind. Exactly one flow can be
    /// active at a time.
    pub fn iniciar(&mut self, kind: DocumentKind) -> Result<FlowStart, AssistError> {
        if self.ativo() {
            return Err(AssistError::validation(
                "já existe um fluxo de documento em andamento",
            ));
        }

        let definicao = definicao(kind);
        info!(tipo = %kind, "guided flow started");

        let mut coleta = Coleta {
            definicao,
            passo: 0,
            dados: Map::new(),
            coletor: None,
        };
        Self::preparar_passo(&mut coleta);
        let primeiro_passo = prompt_do_passo(&definicao.passos[0]);
        self.estado = Estado::Coletando(coleta);

        Ok(FlowStart {
            mensagens: vec![
                format!(
                    "Iniciando criação de {}. Vou guiá-lo pelo processo.",
                    definicao.nome
                ),
                MENSAGEM_FUNDAMENTACAO.to_string(),
            ],
            primeiro_passo,
        })
    }

    /// Answer the current text-like step. Image steps only accept the image
    /// operations below.
    pub fn responder_texto(&mut self, resposta: &str) -> Result<FlowProgress, AssistError> {
        let coleta = self.coleta_mut()?;
        let definicao = coleta.definicao;
        let passo = &definicao.passos[coleta.passo];

        let valor = match passo.kind {
            StepKind::Imagens { .. } => {
                return Err(AssistError::validation(
                    "Envie as imagens pelo controle de upload, pule o passo ou confirme a seleção.",
                ));
            }
            StepKind::Data => {
                let data = resposta.trim();
                if data.is_empty() {
                    return Err(AssistError::validation("Por favor, selecione uma data."));
                }
                data.to_string()
            }
            // Free text and numeric answers are stored verbatim.
            StepKind::Texto | StepKind::Numero => resposta.to_string(),
        };

        coleta.dados.insert(passo.campo.to_string(), Value::String(valor));
        Ok(self.avancar())
    }

    pub fn adicionar_imagens(
        &mut self,
        batch: Vec<ImagemLocal>,
    ) -> Result<AdicaoImagens, AssistError> {
        self.coletor_mut()?.adicionar(batch)
    }

    pub fn remover_imagem(&mut self, indice: usize) -> Result<ImagemLocal, AssistError> {
        self.coletor_mut()?.remover(indice)
    }

    pub fn imagens_selecionadas(&self) -> &[ImagemLocal] {
        match &self.estado {
            Estado::Coletando(Coleta {
                coletor: Some(coletor),
                ..
            }) => coletor.selecionadas(),
            _ => &[],
        }
    }

    /// Explicit skip: stores an empty set and advances.
    pub fn pular_imagens(&mut self) -> Result<FlowProgress, AssistError> {
        let coleta = self.coleta_mut()?;
        let definicao = coleta.definicao;
        let passo = &definicao.passos[coleta.passo];
        if !matches!(passo.kind, StepKind::Imagens { .. }) {
            return Err(AssistError::validation("este passo não aceita imagens"));
        }

        coleta.dados.insert(passo.campo.to_string(), Value::Array(Vec::new()));
        coleta.coletor = None;
        Ok(self.avancar())
    }

    /// Upload the confirmed set and store the returned reference. On upload
    /// failure the collector keeps its images so the user can retry.
    pub async fn confirmar_imagens(
        &mut self,
        uploader: &dyn ImageUploader,
    ) -> Result<FlowProgress, AssistError> {
        let (kind, documento_id, resultado) = {
            let coleta = self.coleta_mut()?;
            let kind = coleta.definicao.kind;
            let coletor = coleta.coletor.as_mut().ok_or_else(|| {
                AssistError::validation("este passo não aceita imagens")
            })?;
            if coletor.is_empty() {
                return Err(AssistError::validation(
                    "Selecione pelo menos uma imagem para continuar.",
                ));
            }

            let documento_id = Uuid::new_v4().simple().to_string();
            let resultado = uploader
                .enviar(&documento_id, kind, coletor.selecionadas())
                .await?;
            coletor.tomar();
            (kind, documento_id, resultado)
        };

        info!(tipo = %kind, %documento_id, total = resultado.total, "image set confirmed");

        let coleta = self.coleta_mut()?;
        let definicao = coleta.definicao;
        let passo = &definicao.passos[coleta.passo];
        let valor = serde_json::to_value(&resultado)
            .map_err(|e| AssistError::generation(format!("erro ao serializar upload: {}", e)))?;
        coleta.dados.insert(passo.campo.to_string(), valor);
        coleta.coletor = None;
        Ok(self.avancar())
    }

    fn coleta_mut(&mut self) -> Result<&mut Coleta, AssistError> {
        match &mut self.estado {
            Estado::Coletando(coleta) => Ok(coleta),
            Estado::Idle => Err(AssistError::validation("nenhum fluxo em andamento")),
        }
    }

    fn coletor_mut(&mut self) -> Result<&mut ImageSetCollector, AssistError> {
        let coleta = self.coleta_mut()?;
        coleta
            .coletor
            .as_mut()
            .ok_or_else(|| AssistError::validation("o passo atual não aceita imagens"))
    }

    /// Move to the next step, or finish and reset when the last one is done.
    fn avancar(&mut self) -> FlowProgress {
        let coleta = match &mut self.estado {
            Estado::Coletando(coleta) => coleta,
            Estado::Idle => unreachable!("avancar only runs with an active flow"),
        };

        coleta.passo += 1;

        if coleta.passo >= coleta.definicao.passos.len() {
            let coleta = match std::mem::replace(&mut self.estado, Estado::Idle) {
                Estado::Coletando(coleta) => coleta,
                Estado::Idle => unreachable!(),
            };
            let resumo = montar_resumo(coleta.definicao, &coleta.dados);
            info!(tipo = %coleta.definicao.kind, "guided flow completed");
            return FlowProgress::Concluido(FlowOutcome {
                kind: coleta.definicao.kind,
                resumo,
                dados: coleta.dados,
            });
        }

        Self::preparar_passo(coleta);
        FlowProgress::Proximo(prompt_do_passo(&coleta.definicao.passos[coleta.passo]))
    }

    fn preparar_passo(coleta: &mut Coleta) {
        let passo = &coleta.definicao.passos[coleta.passo];
        coleta.coletor = match passo.kind {
            StepKind::Imagens { maximo } => Some(ImageSetCollector::new(maximo)),
            _ => None,
        };
    }
}

impl Default for FlowSession {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt_do_passo(passo: &FlowStep) -> StepPrompt {
    StepPrompt {
        pergunta: passo.pergunta,
        kind: passo.kind,
    }
}

/// Every step's question paired with the stored answer, "Não informado" for
/// anything missing or empty.
fn montar_resumo(definicao: &FlowDefinition, dados: &Map<String, Value>) -> String {
    let mut resumo = format!("**Resumo de {}**\n\n", definicao.nome);
    for passo in definicao.passos {
        let valor = dados
            .get(passo.campo)
            .map(render_valor)
            .filter(|texto| !texto.is_empty())
            .unwrap_or_else(|| VALOR_NAO_INFORMADO.to_string());
        resumo.push_str(&format!("**{}**\n{}\n\n", passo.pergunta, valor));
    }
    resumo
}

fn render_valor(valor: &Value) -> String {
    match valor {
        Value::String(texto) => texto.clone(),
        Value::Array(itens) if itens.is_empty() => String::new(),
        Value::Object(objeto) => objeto
            .get("total")
            .and_then(Value::as_u64)
            .map(|total| format!("{} imagem(ns) enviada(s)", total))
            .unwrap_or_default(),
        outro => outro.to_string(),
    }
}
