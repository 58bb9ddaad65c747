use crate::completion::CompletionModel;
use crate::model::{ModelConfig, ModelInitError, ModelProvider};
use crate::provider::openai;
use tracing::instrument;

/// Creates the model client for `model_config`.
///
/// `api_key` takes precedence over the `api_key` setting of the model and is
/// used literally; only the setting understands `env:VAR`. Fails
/// with [`ModelInitError::MissingCredential`] when neither yields a key, so no
/// request is ever sent without one.
#[instrument(skip(model_config, api_key), fields(model = %model_config.name))]
pub fn get_completion_llm(
    model_config: ModelConfig,
    api_key: Option<&str>,
) -> Result<Box<dyn CompletionModel + Send + Sync>, ModelInitError> {
    match model_config.provider {
        ModelProvider::Zhipu | ModelProvider::Openai => {
            let model = openai::OpenAIBaseModel::new(model_config, api_key)?;
            Ok(Box::new(model))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_get_completion_llm_openai_provider() {
        let mut settings = HashMap::new();
        settings.insert("base_url".to_string(), "http://localhost:1234".into());
        settings.insert("api_key".to_string(), "sk-dummy".into());
        let model_config = ModelConfig {
            name: "test-openai".to_string(),
            provider: ModelProvider::Openai,
            settings,
        };
        let model = get_completion_llm(model_config, None).unwrap();
        assert_eq!(model.name(), "test-openai");
    }

    #[test]
    fn test_get_completion_llm_missing_credential() {
        let mut settings = HashMap::new();
        settings.insert(
            "api_key".to_string(),
            "env:ZHICHAT_TEST_NEVER_SET_KEY".into(),
        );
        let model_config = ModelConfig {
            name: "glm-4".to_string(),
            provider: ModelProvider::Zhipu,
            settings,
        };
        let err = get_completion_llm(model_config, None).err().unwrap();
        assert!(matches!(err, ModelInitError::MissingCredential(ref src) if src == "ZHICHAT_TEST_NEVER_SET_KEY"));
    }

    #[test]
    fn test_get_completion_llm_prefers_explicit_key() {
        let model_config = ModelConfig {
            name: "glm-4".to_string(),
            provider: ModelProvider::Zhipu,
            settings: HashMap::from([(
                "api_key".to_string(),
                "env:ZHICHAT_TEST_NEVER_SET_KEY".into(),
            )]),
        };
        assert!(get_completion_llm(model_config, Some("sk-from-ui")).is_ok());
    }
}
