use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model configuration for the tool.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default)]
    pub name: String,
    #[serde(alias = "type")]
    pub provider: ModelProvider,
    #[serde(default, flatten)]
    pub settings: HashMap<String, serde_yaml::Value>,
}

/// Supported model provider integrations (serialized as lowercase strings).
///
/// Both speak the OpenAI chat completions protocol and differ only in their
/// defaults.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Zhipu,
    Openai,
}

impl From<ModelProvider> for String {
    fn from(val: ModelProvider) -> Self {
        val.as_str().into()
    }
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match &self {
            ModelProvider::Zhipu => "zhipu",
            ModelProvider::Openai => "openai",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match &self {
            ModelProvider::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
            ModelProvider::Openai => "https://api.openai.com/v1",
        }
    }

    pub fn default_api_key(&self) -> &'static str {
        match &self {
            ModelProvider::Zhipu => "env:ZHIPUAI_API_KEY",
            ModelProvider::Openai => "env:OPENAI_API_KEY",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ModelInitError {
    #[error("API key is not set. Export {0} or enter an API key in the settings.")]
    MissingCredential(String),
    #[error("Invalid settings for model '{model}': {reason}")]
    InvalidSettings { model: String, reason: String },
}

/// Resolves an `api_key` setting. Values of the form `env:NAME` are read from
/// the environment; empty values count as absent.
pub fn resolve_api_key(value: &str) -> Option<String> {
    let key = match value.strip_prefix("env:") {
        Some(var) => std::env::var(var.trim()).ok()?,
        None => value.to_string(),
    };
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Human readable description of where an `api_key` setting is sourced from.
pub fn credential_source(value: &str) -> String {
    match value.strip_prefix("env:") {
        Some(var) => var.trim().to_string(),
        None => "an api_key in the config".to_string(),
    }
}
