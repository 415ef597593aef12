//! Error taxonomy shared across the workspace.
//!
//! Four failure families, each with different handling:
//! - `Configuration` — missing credential or assistant binding; never shown
//!   raw to the user, always routes the generation pipeline to its fallback.
//! - `Transport` — network/HTTP failures talking to a collaborator service.
//! - `Validation` — bad user input in a guided flow step; handled locally
//!   with a re-prompt, never advances the step.
//! - `Generation` — terminal generation failure after primary and fallback
//!   paths were both exhausted.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("configuração ausente: {0}")]
    Configuration(String),

    #[error("falha de comunicação: {0}")]
    Transport(String),

    #[error("entrada inválida: {0}")]
    Validation(String),

    #[error("falha na geração do documento: {0}")]
    Generation(String),
}

impl AssistError {
    pub fn configuration(msg: impl std::fmt::Display) -> Self {
        Self::Configuration(msg.to_string())
    }

    pub fn transport(msg: impl std::fmt::Display) -> Self {
        Self::Transport(msg.to_string())
    }

    pub fn validation(msg: impl std::fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    pub fn generation(msg: impl std::fmt::Display) -> Self {
        Self::Generation(msg.to_string())
    }

    /// Message suitable for a chat bubble. Validation errors carry their
    /// prompt verbatim; everything else gets the generic retry phrasing.
    pub fn mensagem_usuario(&self) -> String {
        match self {
            AssistError::Validation(msg) => msg.clone(),
            AssistError::Generation(_) => {
                "Falha ao gerar o documento. Tente novamente mais tarde.".into()
            }
            _ => "Não foi possível completar a operação. Tente novamente.".into(),
        }
    }
}

pub type Result<T, E = AssistError> = std::result::Result<T, E>;
