pub mod documento;
pub mod error;
pub mod historico;

pub mod settings {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Authentication for the generation API. Either an explicit key from the
    /// admin settings screen or the `OPENAI_API_KEY` environment variable.
    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct ApiAuth {
        pub api_key: Option<String>,
    }

    impl ApiAuth {
        /// Resolve the credential, falling back to the environment.
        pub fn resolve(&self) -> Option<String> {
            self.api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        }
    }

    /// Tuning for the assistant generation path.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct GenerationSettings {
        /// Model used by the stateless completion fallback.
        pub fallback_model: String,
        /// Interval between run status polls, in milliseconds.
        pub poll_interval_ms: u64,
        /// Polls before the run is treated as timed out.
        pub max_poll_attempts: u32,
    }

    impl Default for GenerationSettings {
        fn default() -> Self {
            Self {
                fallback_model: "gpt-4-turbo".into(),
                poll_interval_ms: 1000,
                max_poll_attempts: 30,
            }
        }
    }

    /// Assistant currently bound to the chat view.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SelectedAssistant {
        pub id: String,
        pub name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AppSettings {
        pub auth: ApiAuth,
        pub generation: GenerationSettings,
        /// Base URL of the condominium backend (uploads, assistant directory).
        pub backend_url: String,
        /// Stable per-installation user id, sent with chat requests.
        pub user_id: String,
        #[serde(default)]
        pub selected_assistant: Option<SelectedAssistant>,
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                auth: ApiAuth::default(),
                generation: GenerationSettings::default(),
                backend_url: "http://localhost:5358".into(),
                user_id: format!("user_{}", Uuid::new_v4().simple()),
                selected_assistant: None,
            }
        }
    }
}

pub mod chat_api {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: String, // "system" | "user" | "assistant"
        pub content: String,
    }

    impl ChatMessage {
        pub fn system(content: impl Into<String>) -> Self {
            Self {
                role: "system".into(),
                content: content.into(),
            }
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self {
                role: "user".into(),
                content: content.into(),
            }
        }
    }
}
