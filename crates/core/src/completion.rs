use crate::config::ProfileConfig;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderType {
    System,
    Assistant,
    User,
}

impl From<SenderType> for String {
    fn from(val: SenderType) -> Self {
        val.as_str().into()
    }
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match &self {
            SenderType::System => "system",
            SenderType::User => "user",
            SenderType::Assistant => "assistant",
        }
    }
}

/// A single message in a completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub text: String,
    pub sender: SenderType,
}

impl ChatMessage {
    pub fn new(sender: SenderType, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender,
        }
    }
}

pub enum Completion {
    Response(CompletionResponse),
    Metrics(CompletionMetrics),
}

#[derive(Debug, Clone, Default)]
pub struct CompletionMetrics {
    pub prompt_tokens: u32,
    pub prompt_eval_latency_ms: f32,
    pub completion_tokens: u32,
    pub completion_latency_ms: f32,
}

#[derive(Debug)]
pub struct CompletionResponse {
    pub text: String,
    pub finish_reason: Option<String>,
}

/// Per-request sampling parameters passed through to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        ProfileConfig::default().into()
    }
}

impl From<ProfileConfig> for CompletionSettings {
    fn from(profile: ProfileConfig) -> Self {
        Self {
            temperature: profile.temperature,
            top_p: profile.top_p,
            max_tokens: profile.max_tokens,
            stream: profile.stream,
        }
    }
}

/// A hosted chat model.
///
/// Fragments are yielded in order. An `Err` item ends the turn; the caller
/// stops reading the stream after the first error.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(
        &self,
        messages: &[ChatMessage],
        settings: &CompletionSettings,
    ) -> BoxStream<'static, Result<Completion>>;
}
