use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use zhichat_core::completion::{CompletionModel, CompletionSettings};
use zhichat_core::config::WebConfig;
use zhichat_core::get_completion_llm;
use zhichat_core::model::ModelInitError;
use zhichat_core::session::Conversation;

pub type SharedState = Arc<RwLock<AppState>>;

pub struct AppState {
    pub config: WebConfig,
    // Key entered on the page, used instead of the configured one
    pub api_key: Option<String>,
    pub conversation: Arc<Mutex<Conversation>>,
}

impl AppState {
    pub fn new(config: WebConfig) -> Self {
        let conversation = Conversation::new(
            &config.mode.system_prompt,
            config.strategy,
            config.history_window,
        );
        Self {
            config,
            api_key: None,
            conversation: Arc::new(Mutex::new(conversation)),
        }
    }

    pub fn completion_model(
        &self,
    ) -> Result<Box<dyn CompletionModel + Send + Sync>, ModelInitError> {
        get_completion_llm(self.config.mode.model.clone(), self.api_key.as_deref())
    }

    pub fn completion_settings(&self) -> CompletionSettings {
        self.config.mode.profile.clone().into()
    }

    pub fn has_api_key(&self) -> bool {
        !matches!(
            self.completion_model(),
            Err(ModelInitError::MissingCredential(_))
        )
    }

    /// Whether the server has a key of its own, ignoring one entered on the page.
    pub fn has_configured_api_key(&self) -> bool {
        !matches!(
            get_completion_llm(self.config.mode.model.clone(), None),
            Err(ModelInitError::MissingCredential(_))
        )
    }
}
