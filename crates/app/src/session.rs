//! Chat session: owns the flow state, the busy flag, the conversation
//! history and the per-user thread, and turns every user action into a list
//! of view events.

use crate::view::{ChatBubble, DocumentCard, SessionEvent};
use engine::flow::{FlowProgress, FlowSession, StepKind, StepPrompt};
use engine::pipeline::{ocorrencia_do_fluxo, DocumentPipeline};
use providers::assistants::AssistantsClient;
use providers::threads::ThreadRegistry;
use services::directory::{AssistantPage, DirectoryClient};
use services::intent::IntentDetector;
use services::parser::processar_resposta;
use services::posprocess::{destacar_negrito, limpar_resposta};
use services::prompt::{formatar_data, formatar_valor};
use services::upload::{ImagemLocal, UploadClient};
use shared::documento::ParsedDocument;
use shared::error::AssistError;
use shared::historico::MessageHistory;
use shared::settings::{AppSettings, SelectedAssistant};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

/// Pause between the flow intro messages and the first step prompt, giving
/// the user time to read the instructions.
const ATRASO_PRIMEIRO_PASSO: Duration = Duration::from_millis(1500);

pub struct ChatSession {
    settings: AppSettings,
    detector: IntentDetector,
    flow: FlowSession,
    threads: ThreadRegistry,
    pipeline: DocumentPipeline,
    uploader: UploadClient,
    directory: DirectoryClient,
    historia: MessageHistory,
    /// Single in-flight top-level request; input is refused while set.
    busy: bool,
    /// Last generated document, kept for the printable rendering.
    ultimo_documento: Option<(ParsedDocument, String)>,
}

impl ChatSession {
    pub fn new(settings: AppSettings, historia: MessageHistory) -> Self {
        let pipeline = DocumentPipeline::new(&settings);
        let uploader = UploadClient::new(&settings.backend_url);
        let directory = DirectoryClient::new(&settings.backend_url);
        Self {
            settings,
            detector: IntentDetector::default(),
            flow: FlowSession::new(),
            threads: ThreadRegistry::new(),
            pipeline,
            uploader,
            directory,
            historia,
            busy: false,
            ultimo_documento: None,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn historia(&self) -> &MessageHistory {
        &self.historia
    }

    pub fn assistente(&self) -> Option<&SelectedAssistant> {
        self.settings.selected_assistant.as_ref()
    }

    pub fn fluxo_ativo(&self) -> bool {
        self.flow.ativo()
    }

    pub fn passo_de_imagens(&self) -> bool {
        matches!(
            self.flow.passo_atual().map(|p| p.kind),
            Some(StepKind::Imagens { .. })
        )
    }

    pub async fn listar_assistentes(
        &self,
        limit: usize,
        offset: usize,
        search: Option<&str>,
    ) -> Result<AssistantPage, AssistError> {
        self.directory.listar_assistentes(limit, offset, search).await
    }

    /// Bind the chat to an assistant. Returns whether a stored conversation
    /// exists so the caller can offer to resume it.
    pub fn selecionar_assistente(&mut self, id: &str, nome: &str) -> (Vec<SessionEvent>, bool) {
        info!(assistant_id = %id, nome = %nome, "assistant selected");
        self.settings.selected_assistant = Some(SelectedAssistant {
            id: id.to_string(),
            name: nome_or_default(nome),
        });
        let eventos = vec![self.bolha_bot(
            format!("✨ Assistente \"{}\" selecionado com sucesso!", nome),
            false,
        )];
        let tem_historico = self.historia.has_conversation(id);
        (eventos, tem_historico)
    }

    /// Replay the stored conversation for the selected assistant.
    pub fn retomar_conversa(&mut self) -> Vec<SessionEvent> {
        let Some(assistente) = self.assistente() else {
            return Vec::new();
        };
        self.historia
            .messages_for(&assistente.id)
            .iter()
            .map(|msg| {
                SessionEvent::Bubble(ChatBubble::new(msg.text.clone(), msg.is_user))
            })
            .collect()
    }

    /// Drop the active thread and greet a fresh conversation.
    pub fn nova_conversa(&mut self) -> Vec<SessionEvent> {
        let user_id = self.settings.user_id.clone();
        self.threads.reset(&user_id);
        let nome = self
            .assistente()
            .map(|a| a.name.clone())
            .unwrap_or_else(|| "Assistente".to_string());
        vec![self.bolha_bot(format!("✨ Nova conversa iniciada com {}!", nome), true)]
    }

    /// Main entry point for one typed message.
    pub async fn handle_message(&mut self, texto: &str) -> Vec<SessionEvent> {
        let texto = texto.trim();
        if texto.is_empty() {
            return Vec::new();
        }

        if self.busy {
            return vec![SessionEvent::Bubble(ChatBubble::new(
                "Aguarde a resposta anterior antes de enviar outra mensagem.",
                false,
            ))];
        }

        if self.assistente().is_none() {
            return vec![SessionEvent::Bubble(ChatBubble::new(
                "Por favor, selecione um assistente primeiro!",
                false,
            ))];
        }

        let mut eventos = vec![self.bolha_usuario(texto)];

        if self.flow.ativo() {
            eventos.extend(self.responder_fluxo(texto).await);
            return eventos;
        }

        if let Some(kind) = self.detector.detect(texto) {
            eventos.extend(self.iniciar_fluxo(kind).await);
            return eventos;
        }

        eventos.extend(self.conversar(texto).await);
        eventos
    }

    async fn iniciar_fluxo(&mut self, kind: shared::documento::DocumentKind) -> Vec<SessionEvent> {
        let inicio = match self.flow.iniciar(kind) {
            Ok(inicio) => inicio,
            Err(e) => return vec![self.bolha_erro(&e)],
        };

        let mut eventos: Vec<SessionEvent> = inicio
            .mensagens
            .into_iter()
            .map(|mensagem| self.bolha_bot(mensagem, true))
            .collect();

        // Let the user read the instructions before the first question.
        tokio::time::sleep(ATRASO_PRIMEIRO_PASSO).await;
        eventos.extend(self.apresentar_passo(&inicio.primeiro_passo));
        eventos
    }

    async fn responder_fluxo(&mut self, texto: &str) -> Vec<SessionEvent> {
        match self.flow.responder_texto(texto) {
            Ok(FlowProgress::Proximo(prompt)) => self.apresentar_passo(&prompt),
            Ok(FlowProgress::Concluido(outcome)) => self.concluir_fluxo(outcome).await,
            Err(e) => vec![self.bolha_erro(&e)],
        }
    }

    fn apresentar_passo(&mut self, prompt: &StepPrompt) -> Vec<SessionEvent> {
        let mut eventos = vec![self.bolha_bot(prompt.pergunta.to_string(), true)];
        match prompt.kind {
            StepKind::Imagens { maximo } => {
                eventos.push(SessionEvent::Bubble(ChatBubble::new(
                    format!(
                        "Envie com /imagem <caminho> (máximo {}), remova com /remover <n>, pule com /pular ou finalize com /confirmar.",
                        maximo
                    ),
                    false,
                )));
            }
            StepKind::Data => {
                eventos.push(SessionEvent::Bubble(ChatBubble::new(
                    "Informe a data (AAAA-MM-DD ou DD/MM/AAAA).",
                    false,
                )));
            }
            StepKind::Texto | StepKind::Numero => {}
        }
        eventos
    }

    /// Summary, then dispatch to the document pipeline. The flow state is
    /// already reset when we get here, so a failed generation still leaves
    /// the session ready for a new attempt.
    async fn concluir_fluxo(&mut self, outcome: engine::flow::FlowOutcome) -> Vec<SessionEvent> {
        let mut eventos = vec![self.bolha_bot(outcome.resumo.clone(), true)];

        let assistant_id = self.assistente().map(|a| a.id.clone());
        let ocorrencia = ocorrencia_do_fluxo(&outcome.dados, assistant_id);

        self.busy = true;
        let resultado = self.pipeline.gerar_documento(&ocorrencia, outcome.kind).await;
        self.busy = false;

        match resultado {
            Ok(corpo) => {
                let documento = ParsedDocument {
                    kind: outcome.kind,
                    data: formatar_data(&ocorrencia.data),
                    valor: ocorrencia.valor.map(formatar_valor),
                    descricao: ocorrencia.descricao.clone(),
                    fundamentacao: None,
                };

                eventos.push(self.bolha_bot("Documento gerado com sucesso!".to_string(), true));
                eventos.push(self.bolha_bot(corpo.clone(), true));
                eventos.push(SessionEvent::Card(DocumentCard::from_documento(&documento)));
                self.ultimo_documento = Some((documento, corpo));
            }
            Err(e) => {
                error!(error = %e, "document generation failed");
                eventos.push(self.bolha_bot(
                    format!("❌ Erro ao gerar documento: {}", e.mensagem_usuario()),
                    true,
                ));
            }
        }
        eventos
    }

    /// Plain conversational turn against the selected assistant.
    async fn conversar(&mut self, texto: &str) -> Vec<SessionEvent> {
        let Some(assistente) = self.assistente().cloned() else {
            return Vec::new();
        };
        let user_id = self.settings.user_id.clone();

        let client = match AssistantsClient::from_auth(&self.settings.auth) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "assistants client unavailable");
                return vec![self.bolha_bot(format!("❌ Erro: {}", e.mensagem_usuario()), true)];
            }
        };

        self.busy = true;
        let resultado = self
            .threads
            .chat(
                &client,
                &assistente.id,
                texto,
                &user_id,
                Duration::from_millis(self.settings.generation.poll_interval_ms),
                self.settings.generation.max_poll_attempts,
            )
            .await;
        self.busy = false;

        match resultado {
            Ok(resposta) => {
                let resposta = destacar_negrito(&limpar_resposta(&resposta));
                let processada = processar_resposta(&resposta);

                let mut eventos = vec![self.bolha_bot(processada.texto_exibicao.clone(), true)];
                if let Some(documento) = processada.documento {
                    eventos.push(SessionEvent::Card(DocumentCard::from_documento(&documento)));
                    self.ultimo_documento = Some((documento, processada.texto_exibicao));
                }
                eventos
            }
            Err(e) => {
                error!(error = %e, "chat turn failed");
                vec![self.bolha_bot(format!("❌ Erro: {}", e), true)]
            }
        }
    }

    // ── Image step operations ────────────────────────────────────────

    pub fn adicionar_imagem(&mut self, caminho: &Path) -> Vec<SessionEvent> {
        let imagem = match ImagemLocal::from_path(caminho) {
            Ok(imagem) => imagem,
            Err(e) => return vec![self.bolha_erro(&e)],
        };

        match self.flow.adicionar_imagens(vec![imagem]) {
            Ok(adicao) => {
                let mut eventos: Vec<SessionEvent> = adicao
                    .recusadas
                    .into_iter()
                    .map(|aviso| SessionEvent::Bubble(ChatBubble::new(aviso, false)))
                    .collect();
                if adicao.aceitas > 0 {
                    eventos.push(SessionEvent::Bubble(ChatBubble::new(
                        format!(
                            "📷 {} imagem(ns) na seleção.",
                            self.flow.imagens_selecionadas().len()
                        ),
                        false,
                    )));
                }
                eventos
            }
            Err(e) => vec![self.bolha_erro(&e)],
        }
    }

    pub fn remover_imagem(&mut self, indice: usize) -> Vec<SessionEvent> {
        match self.flow.remover_imagem(indice) {
            Ok(imagem) => vec![SessionEvent::Bubble(ChatBubble::new(
                format!("Imagem {} removida da seleção.", imagem.nome),
                false,
            ))],
            Err(e) => vec![self.bolha_erro(&e)],
        }
    }

    pub async fn pular_imagens(&mut self) -> Vec<SessionEvent> {
        match self.flow.pular_imagens() {
            Ok(progresso) => {
                let mut eventos = vec![self.bolha_usuario("📷 Upload de imagens foi pulado")];
                eventos.extend(self.continuar_fluxo(progresso).await);
                eventos
            }
            Err(e) => vec![self.bolha_erro(&e)],
        }
    }

    pub async fn confirmar_imagens(&mut self) -> Vec<SessionEvent> {
        self.busy = true;
        let resultado = self.flow.confirmar_imagens(&self.uploader).await;
        self.busy = false;

        match resultado {
            Ok(progresso) => {
                let mut eventos =
                    vec![self.bolha_usuario("📷 Imagens enviadas com sucesso")];
                eventos.extend(self.continuar_fluxo(progresso).await);
                eventos
            }
            Err(e) => vec![self.bolha_erro(&e)],
        }
    }

    async fn continuar_fluxo(&mut self, progresso: FlowProgress) -> Vec<SessionEvent> {
        match progresso {
            FlowProgress::Proximo(prompt) => self.apresentar_passo(&prompt),
            FlowProgress::Concluido(outcome) => self.concluir_fluxo(outcome).await,
        }
    }

    /// Printable rendering of the last generated document.
    pub fn documento_para_impressao(&self) -> Option<String> {
        self.ultimo_documento
            .as_ref()
            .map(|(documento, corpo)| crate::view::render_documento_impressao(documento, corpo))
    }

    // ── Bubbles & history ────────────────────────────────────────────

    fn bolha_usuario(&mut self, texto: &str) -> SessionEvent {
        self.registrar(texto, true);
        SessionEvent::Bubble(ChatBubble::new(texto, true))
    }

    fn bolha_bot(&mut self, texto: String, registrar: bool) -> SessionEvent {
        if registrar {
            self.registrar(&texto, false);
        }
        SessionEvent::Bubble(ChatBubble::new(texto, false))
    }

    fn bolha_erro(&mut self, erro: &AssistError) -> SessionEvent {
        warn!(error = %erro, "user-facing validation/transport error");
        SessionEvent::Bubble(ChatBubble::new(erro.mensagem_usuario(), false))
    }

    fn registrar(&mut self, texto: &str, de_usuario: bool) {
        if let Some(assistente) = self.settings.selected_assistant.clone() {
            self.historia
                .record(&assistente.id, &assistente.name, texto, de_usuario);
        }
    }
}

fn nome_or_default(nome: &str) -> String {
    if nome.trim().is_empty() {
        "Assistente".to_string()
    } else {
        nome.to_string()
    }
}
