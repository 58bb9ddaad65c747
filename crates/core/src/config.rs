use std::{
    collections::HashMap,
    fs::{self, File},
    io::Write,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::{
    assets::{get_config_dir, get_default_config},
    model::ModelConfig,
    prompt::PromptStrategy,
};

pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个有用的AI助手";
pub const DEFAULT_HISTORY_WINDOW: usize = 10;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8501;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File system error: {0}")]
    IO(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YAMLError(#[from] serde_yaml::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProfileConfig {
    pub temperature: f32,
    pub top_p: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: None,
            stream: true,
        }
    }
}

impl ProfileConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::Config(format!(
                "top_p must be between 0 and 1, got {}",
                self.top_p
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModeConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    pub system_prompt: String,
}

/// Settings for the web chat page.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub mode: ModeConfig,
    pub strategy: PromptStrategy,
    pub history_window: usize,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub models: HashMap<String, ModelConfig>,
    pub profiles: HashMap<String, ProfileConfig>,
    pub chat: ModeConfig,
    pub web: WebConfig,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum StringOrObject<T> {
    String(String),
    Object(T),
}

#[derive(Deserialize, Debug)]
struct RawConfig {
    models: HashMap<String, ModelConfig>,
    #[serde(default)]
    profiles: HashMap<String, ProfileConfig>,
    chat: RawModeConfig,
    web: Option<RawWebConfig>,
}

#[derive(Deserialize, Debug)]
struct RawModeConfig {
    model: StringOrObject<ModelConfig>,
    #[serde(default)]
    profile: Option<StringOrObject<ProfileConfig>>,
    #[serde(default)]
    system_prompt: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawWebConfig {
    model: Option<StringOrObject<ModelConfig>>,
    #[serde(default)]
    profile: Option<StringOrObject<ProfileConfig>>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    strategy: PromptStrategy,
    history_window: Option<usize>,
    host: Option<String>,
    port: Option<u16>,
}

impl RawConfig {
    #[instrument]
    fn to_config(&self) -> Result<Config, ConfigError> {
        let mut models_with_names = HashMap::new();
        for (k, v) in &self.models {
            // Update model name if not set
            let model_name = if v.name.is_empty() {
                k.clone()
            } else {
                v.name.clone()
            };
            let model = ModelConfig {
                name: model_name,
                ..v.clone()
            };
            models_with_names.insert(k.clone(), model);
        }

        for profile in self.profiles.values() {
            profile.validate()?;
        }

        let resolve_model =
            |model_entry: &StringOrObject<ModelConfig>| -> Result<ModelConfig, ConfigError> {
                match model_entry {
                    StringOrObject::String(s) => models_with_names
                        .get(s)
                        .cloned()
                        .ok_or_else(|| ConfigError::Config(format!("Model '{s}' not found"))),
                    StringOrObject::Object(m) => Ok(m.clone()),
                }
            };

        let resolve_profile = |profile_entry: &Option<StringOrObject<ProfileConfig>>| -> Result<ProfileConfig, ConfigError> {
            let profile = match profile_entry {
                Some(StringOrObject::String(s)) => self.profiles
                    .get(s)
                    .cloned()
                    .ok_or_else(|| ConfigError::Config(format!("Profile '{s}' not found")))?,
                Some(StringOrObject::Object(p)) => p.clone(),
                None => ProfileConfig::default(),
            };
            profile.validate()?;
            Ok(profile)
        };

        let chat = ModeConfig {
            model: resolve_model(&self.chat.model)?,
            profile: resolve_profile(&self.chat.profile)?,
            system_prompt: self
                .chat
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        };

        // The web section inherits anything it leaves out from the chat section.
        let web = match &self.web {
            None => WebConfig {
                mode: chat.clone(),
                strategy: PromptStrategy::default(),
                history_window: DEFAULT_HISTORY_WINDOW,
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            },
            Some(raw) => {
                let model = match &raw.model {
                    Some(entry) => resolve_model(entry)?,
                    None => chat.model.clone(),
                };
                let profile = match &raw.profile {
                    Some(_) => resolve_profile(&raw.profile)?,
                    None => chat.profile.clone(),
                };
                let history_window = raw.history_window.unwrap_or(DEFAULT_HISTORY_WINDOW);
                if history_window == 0 {
                    return Err(ConfigError::Config(
                        "history_window must be at least 1".to_string(),
                    ));
                }
                WebConfig {
                    mode: ModeConfig {
                        model,
                        profile,
                        system_prompt: raw
                            .system_prompt
                            .clone()
                            .unwrap_or_else(|| chat.system_prompt.clone()),
                    },
                    strategy: raw.strategy,
                    history_window,
                    host: raw.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
                    port: raw.port.unwrap_or(DEFAULT_PORT),
                }
            }
        };

        Ok(Config {
            models: models_with_names,
            profiles: self.profiles.clone(),
            chat,
            web,
        })
    }
}

#[instrument(skip(config_path))]
pub fn create_or_get_config_file(
    config_path: Option<PathBuf>,
) -> Result<(bool, PathBuf), ConfigError> {
    let actual_path = config_path.unwrap_or_else(|| {
        let config_dir = get_config_dir();
        config_dir.join("zhichat.yml")
    });

    let parent_dir = actual_path.parent().ok_or_else(|| {
        ConfigError::IO(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Config path has no parent directory",
        ))
    })?;

    if !parent_dir.exists() {
        fs::create_dir_all(parent_dir)?;
    }

    if actual_path.exists() {
        Ok((true, actual_path))
    } else {
        tracing::info!("Creating default config at {}", actual_path.display());
        File::create(&actual_path)?.write_all(get_default_config().as_bytes())?;
        Ok((false, actual_path))
    }
}

#[instrument(skip(config_path))]
pub fn get_config(config_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let (_, config_file) = create_or_get_config_file(config_path)?;
    let content = fs::read_to_string(&config_file)?;
    parse_config(&content)
}

/// Parses and resolves config file content.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = serde_yaml::from_str(content)?;
    raw.to_config()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;
    use crate::model::ModelProvider;
    use crate::test_utils::{create_temp_config, dummy_model_config};

    // Dummy config content for tests
    const DUMMY_CONFIG_CONTENT: &str = r#"
models:
  glm-4:
    type: zhipu
    api_key: env:ZHIPUAI_API_KEY
  local:
    name: qwen2.5
    provider: openai
    base_url: http://localhost:8080/v1
    api_key: none
profiles:
  default:
    temperature: 0.7
    top_p: 0.9
  precise:
    temperature: 0.1
    top_p: 0.5
    max_tokens: 512
    stream: false
chat:
  model: glm-4
  profile: default
web:
  model: local
  profile: precise
  system_prompt: Be brief.
  strategy: flattened
  history_window: 6
  port: 9000
"#;

    #[test]
    fn test_profile_config_default() {
        let default_profile = ProfileConfig::default();
        assert_eq!(default_profile.temperature, 0.7);
        assert_eq!(default_profile.top_p, 0.9);
        assert_eq!(default_profile.max_tokens, None);
        assert!(default_profile.stream);
    }

    #[test]
    fn test_parse_config_valid() {
        let config = parse_config(DUMMY_CONFIG_CONTENT).unwrap();

        assert_eq!(config.models.len(), 2);
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.chat.model.name, "glm-4");
        assert_eq!(config.chat.model.provider, ModelProvider::Zhipu);
        assert_eq!(config.chat.profile.temperature, 0.7);
        assert_eq!(config.chat.system_prompt, DEFAULT_SYSTEM_PROMPT);

        assert_eq!(config.web.mode.model.name, "qwen2.5");
        assert_eq!(config.web.mode.profile.max_tokens, Some(512));
        assert!(!config.web.mode.profile.stream);
        assert_eq!(config.web.mode.system_prompt, "Be brief.");
        assert_eq!(config.web.strategy, PromptStrategy::Flattened);
        assert_eq!(config.web.history_window, 6);
        assert_eq!(config.web.host, DEFAULT_HOST);
        assert_eq!(config.web.port, 9000);
    }

    #[test]
    fn test_web_section_falls_back_to_chat() {
        let content = r#"
models:
  glm-4:
    type: zhipu
chat:
  model: glm-4
  system_prompt: Hello there.
"#;
        let config = parse_config(content).unwrap();
        assert_eq!(config.web.mode.model.name, "glm-4");
        assert_eq!(config.web.mode.system_prompt, "Hello there.");
        assert_eq!(config.web.strategy, PromptStrategy::Messages);
        assert_eq!(config.web.history_window, DEFAULT_HISTORY_WINDOW);
        assert_eq!(config.web.port, DEFAULT_PORT);
    }

    #[test]
    fn test_inline_model_and_profile() {
        let content = r#"
models: {}
chat:
  model:
    name: inline-chat-model
    provider: openai
  profile:
    temperature: 0.2
    top_p: 1.0
"#;
        let config = parse_config(content).unwrap();
        assert_eq!(config.chat.model.name, "inline-chat-model");
        assert_eq!(config.chat.profile.temperature, 0.2);
        assert!(config.chat.profile.stream);
    }

    #[test]
    fn test_missing_model_reference() {
        let content = r#"
models:
  glm-4:
    type: zhipu
chat:
  model: non-existent-model
"#;
        let err = parse_config(content).unwrap_err();
        assert!(
            matches!(err, ConfigError::Config(msg) if msg.contains("Model 'non-existent-model' not found"))
        );
    }

    #[test]
    fn test_missing_profile_reference() {
        let mut models = HashMap::new();
        models.insert("glm-4".to_string(), dummy_model_config("glm-4"));

        let raw_config = RawConfig {
            models,
            profiles: HashMap::new(),
            chat: RawModeConfig {
                model: StringOrObject::String("glm-4".to_string()),
                profile: Some(StringOrObject::String("non-existent-profile".to_string())),
                system_prompt: None,
            },
            web: None,
        };

        let err = raw_config.to_config().unwrap_err();
        assert!(
            matches!(err, ConfigError::Config(msg) if msg.contains("Profile 'non-existent-profile' not found"))
        );
    }

    #[test]
    fn test_out_of_range_top_p() {
        let content = r#"
models:
  glm-4:
    type: zhipu
profiles:
  wild:
    temperature: 0.7
    top_p: 1.5
chat:
  model: glm-4
  profile: wild
"#;
        let err = parse_config(content).unwrap_err();
        assert!(matches!(err, ConfigError::Config(msg) if msg.contains("top_p")));
    }

    #[test]
    fn test_zero_history_window() {
        let content = r#"
models:
  glm-4:
    type: zhipu
chat:
  model: glm-4
web:
  history_window: 0
"#;
        let err = parse_config(content).unwrap_err();
        assert!(matches!(err, ConfigError::Config(msg) if msg.contains("history_window")));
    }

    #[test]
    fn test_create_or_get_config_file_when_exists() {
        let config_path = create_temp_config(DUMMY_CONFIG_CONTENT);

        let (exists, file_path) = create_or_get_config_file(Some(config_path.clone())).unwrap();

        assert!(exists);
        assert_eq!(file_path, config_path);
    }

    #[test]
    fn test_create_or_get_config_file_when_not_exist() {
        let config_dir = tempdir().unwrap();
        let config_file = config_dir.path().join("nested").join("zhichat.yml");

        let (exists, file_path) = create_or_get_config_file(Some(config_file.clone())).unwrap();

        assert!(!exists);
        assert_eq!(file_path, config_file);
        assert!(file_path.exists());
    }

    #[test]
    fn test_get_config_loads_default_config() {
        let config_dir = tempdir().unwrap();
        let config_file = config_dir.path().join("zhichat.yml");

        let config = get_config(Some(config_file)).unwrap();
        assert_eq!(config.chat.model.name, "glm-4");
        assert_eq!(config.chat.model.provider, ModelProvider::Zhipu);
        assert_eq!(config.web.history_window, DEFAULT_HISTORY_WINDOW);
    }

    #[test]
    fn test_get_config_throws_for_invalid_yaml() {
        let config_file = create_temp_config("invalid yaml content: - [");
        let err = get_config(Some(config_file)).unwrap_err();
        assert!(matches!(err, ConfigError::YAMLError(_)));
        assert!(format!("{err}").contains("YAML parsing error"));
    }
}
