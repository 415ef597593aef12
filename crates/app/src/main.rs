//! Zelador — condominium assistant chat for the terminal.
//!
//! Talks to per-condominium assistants, walks the user through the guided
//! document flows (advertência / multa) and renders the generated documents.

use anyhow::Result;
use services::directory::AssistantInfo;
use std::io::{BufRead, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod session;
mod view;

use session::ChatSession;
use view::render_event;

const AJUDA: &str = "\
Comandos:
  /assistentes [busca]   lista os assistentes disponíveis
  /selecionar <n>        seleciona um assistente da última listagem
  /nova                  inicia uma nova conversa
  /conversas             lista conversas recentes
  /imagem <caminho>      adiciona uma imagem no passo de evidências
  /remover <n>           remove a n-ésima imagem da seleção
  /pular                 pula o passo de imagens
  /confirmar             envia as imagens selecionadas
  /imprimir              versão para impressão do último documento
  /ajuda                 mostra esta ajuda
  /sair                  salva e encerra";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = config::load_settings()?;
    let historia = config::load_history();
    info!(user_id = %settings.user_id, "session starting");

    let mut session = ChatSession::new(settings, historia);
    let mut ultima_listagem: Vec<AssistantInfo> = Vec::new();

    println!("Zelador — assistente de condomínio");
    println!("{}\n", AJUDA);
    if let Some(assistente) = session.assistente() {
        println!("Assistente atual: {}\n", assistente.name);
    }

    let stdin = std::io::stdin();
    let mut linhas = stdin.lock().lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(linha) = linhas.next() else { break };
        let linha = linha?;
        let entrada = linha.trim();
        if entrada.is_empty() {
            continue;
        }

        let eventos = match entrada.split_once(' ') {
            Some(("/assistentes", termo)) => {
                listar_assistentes(&session, &mut ultima_listagem, Some(termo)).await;
                Vec::new()
            }
            Some(("/selecionar", indice)) => {
                selecionar(&mut session, &ultima_listagem, indice, &mut linhas)
            }
            Some(("/imagem", caminho)) => {
                session.adicionar_imagem(std::path::Path::new(caminho.trim()))
            }
            Some(("/remover", indice)) => match indice.trim().parse::<usize>() {
                Ok(n) if n >= 1 => session.remover_imagem(n - 1),
                _ => {
                    println!("Informe a posição da imagem, por exemplo: /remover 1");
                    Vec::new()
                }
            },
            None => match entrada {
                "/sair" => break,
                "/ajuda" => {
                    println!("{}", AJUDA);
                    Vec::new()
                }
                "/assistentes" => {
                    listar_assistentes(&session, &mut ultima_listagem, None).await;
                    Vec::new()
                }
                "/nova" => nova_conversa(&mut session, &mut linhas),
                "/conversas" => {
                    listar_conversas(&session);
                    Vec::new()
                }
                "/pular" => session.pular_imagens().await,
                "/confirmar" => session.confirmar_imagens().await,
                "/imprimir" => {
                    match session.documento_para_impressao() {
                        Some(documento) => println!("\n{}\n", documento),
                        None => println!("Nenhum documento gerado nesta sessão ainda."),
                    }
                    Vec::new()
                }
                _ => session.handle_message(entrada).await,
            },
            Some((_, _)) => session.handle_message(entrada).await,
        };

        for evento in &eventos {
            println!("{}", render_event(evento));
        }
    }

    config::save_settings(session.settings())?;
    config::save_history(session.historia())?;
    println!("Até logo!");
    Ok(())
}

async fn listar_assistentes(
    session: &ChatSession,
    ultima_listagem: &mut Vec<AssistantInfo>,
    termo: Option<&str>,
) {
    let termo = termo.map(str::trim).filter(|t| !t.is_empty());
    match session.listar_assistentes(20, 0, termo).await {
        Ok(pagina) => {
            if pagina.assistants.is_empty() {
                println!("Nenhum assistente encontrado.");
                return;
            }
            for (indice, assistente) in pagina.assistants.iter().enumerate() {
                println!("{:>3}. {} ({})", indice + 1, assistente.display_name(), assistente.id);
            }
            if pagina.has_more {
                println!("... há mais assistentes; refine a busca.");
            }
            *ultima_listagem = pagina.assistants;
        }
        Err(e) => println!("Erro ao carregar assistentes: {}", e),
    }
}

fn selecionar(
    session: &mut ChatSession,
    ultima_listagem: &[AssistantInfo],
    indice: &str,
    linhas: &mut impl Iterator<Item = std::io::Result<String>>,
) -> Vec<view::SessionEvent> {
    let escolhido = match indice.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= ultima_listagem.len() => &ultima_listagem[n - 1],
        _ => {
            println!("Use /assistentes e depois /selecionar <número da lista>.");
            return Vec::new();
        }
    };

    let nome = escolhido.display_name();
    let (mut eventos, tem_historico) = session.selecionar_assistente(&escolhido.id, &nome);

    if tem_historico {
        println!(
            "Existe uma conversa anterior com {}. Deseja carregá-la? (s/n)",
            nome
        );
        let carregar = matches!(
            linhas.next().and_then(|l| l.ok()).as_deref().map(str::trim),
            Some("s") | Some("S") | Some("sim")
        );
        if carregar {
            eventos.extend(session.retomar_conversa());
            return eventos;
        }
    }

    eventos.extend(session.nova_conversa());
    eventos
}

fn nova_conversa(
    session: &mut ChatSession,
    linhas: &mut impl Iterator<Item = std::io::Result<String>>,
) -> Vec<view::SessionEvent> {
    println!("Tem certeza que deseja iniciar uma nova conversa? O histórico atual será perdido. (s/n)");
    let confirmado = matches!(
        linhas.next().and_then(|l| l.ok()).as_deref().map(str::trim),
        Some("s") | Some("S") | Some("sim")
    );
    if confirmado {
        session.nova_conversa()
    } else {
        Vec::new()
    }
}

fn listar_conversas(session: &ChatSession) {
    let conversas = session.historia().recent_conversations();
    if conversas.is_empty() {
        println!("Nenhuma conversa recente.");
        return;
    }
    for conversa in conversas {
        let quando = chrono::DateTime::from_timestamp_millis(conversa.last_update)
            .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "- {} ({} mensagens, última em {})",
            conversa.name, conversa.message_count, quando
        );
    }
}
