use super::openai_types::{
    ChatCompletionResponse, ChatCompletionStreamResponse, RequestMessage, Usage,
};
use crate::completion::{
    ChatMessage, Completion, CompletionMetrics, CompletionModel, CompletionResponse,
    CompletionSettings,
};
use crate::model::{ModelConfig, ModelInitError, credential_source, resolve_api_key};
use anyhow::{Result, anyhow};
use async_openai::config::OpenAIConfig;
use async_openai::{Client as OpenAIClient, error::OpenAIError};
use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::{Value, json};
use std::pin::Pin;
use std::time::Instant;
use tracing::{debug, error};

type ChatStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionStreamResponse, OpenAIError>> + Send>>;

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct OpenAISettings {
    base_url: Option<String>,
    api_key: Option<String>,
}

pub struct OpenAIBaseModel {
    config: ModelConfig,
    client: OpenAIClient<OpenAIConfig>,
}

impl OpenAIBaseModel {
    pub fn new(model_config: ModelConfig, api_key: Option<&str>) -> Result<Self, ModelInitError> {
        let invalid = |reason: String| ModelInitError::InvalidSettings {
            model: model_config.name.clone(),
            reason,
        };
        let settings: OpenAISettings = serde_yaml::to_value(&model_config.settings)
            .and_then(serde_yaml::from_value)
            .map_err(|e| invalid(e.to_string()))?;

        let provider = model_config.provider;
        let key_setting = settings
            .api_key
            .unwrap_or_else(|| provider.default_api_key().to_string());
        // An explicit key is used as given; only the config setting may name an env var.
        let explicit_key = api_key.map(str::trim).filter(|key| !key.is_empty());
        let api_key = match explicit_key {
            Some(key) => key.to_string(),
            None => resolve_api_key(&key_setting)
                .ok_or_else(|| ModelInitError::MissingCredential(credential_source(&key_setting)))?,
        };

        let base_url = settings
            .base_url
            .unwrap_or_else(|| provider.default_base_url().to_string());
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url.trim_end_matches('/'));

        Ok(Self {
            config: model_config,
            client: OpenAIClient::with_config(config),
        })
    }

    fn build_request(&self, messages: &[ChatMessage], settings: &CompletionSettings) -> Value {
        let messages: Vec<RequestMessage> = messages
            .iter()
            .map(|msg| RequestMessage {
                role: msg.sender.as_str(),
                content: msg.text.as_str(),
            })
            .collect();

        let mut request = json!({
            "model": self.config.name,
            "messages": messages,
            "temperature": settings.temperature,
            "top_p": settings.top_p,
            "stream": settings.stream,
        });
        if let Some(max_tokens) = settings.max_tokens {
            request["max_tokens"] = json!(max_tokens);
        }
        request
    }
}

fn metrics_from(usage: &Usage, prompt_ms: f32, total_ms: f32) -> Completion {
    Completion::Metrics(CompletionMetrics {
        prompt_tokens: usage.prompt_tokens,
        prompt_eval_latency_ms: prompt_ms,
        completion_tokens: usage.completion_tokens,
        completion_latency_ms: total_ms,
    })
}

#[async_trait]
impl CompletionModel for OpenAIBaseModel {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        settings: &CompletionSettings,
    ) -> BoxStream<'static, Result<Completion>> {
        let request = self.build_request(messages, settings);
        let client = self.client.clone();
        debug!(model = %self.config.name, stream = settings.stream, "Sending chat request");

        if !settings.stream {
            return Box::pin(futures::stream::once(async move {
                let start_time = Instant::now();
                let response: ChatCompletionResponse = client
                    .chat()
                    .create_byot(request)
                    .await
                    .map_err(|err| anyhow!("Chat request failed: {err}"))?;
                let elapsed = start_time.elapsed().as_millis() as f32;
                Ok::<_, anyhow::Error>((response, elapsed))
            })
            .flat_map(|result| {
                let items: Vec<Result<Completion>> = match result {
                    Ok((response, elapsed)) => {
                        let mut items = Vec::new();
                        if let Some(choice) = response.choices.first() {
                            items.push(Ok(Completion::Response(CompletionResponse {
                                text: choice.message.content.clone().unwrap_or_default(),
                                finish_reason: choice.finish_reason.map(|r| r.as_str().to_string()),
                            })));
                        }
                        if let Some(usage) = &response.usage {
                            items.push(Ok(metrics_from(usage, elapsed, 0.0)));
                        }
                        items
                    }
                    Err(err) => vec![Err(err)],
                };
                futures::stream::iter(items)
            }));
        }

        let start_time = Instant::now();
        let outer_stream = async_stream::stream! {
            let mut prev_time = start_time;
            let mut first_chunk = true;
            let mut prompt_eval_latency = 0.0;
            let mut completion_latency = 0.0;

            let response: Result<ChatStream, OpenAIError> =
                client.chat().create_stream_byot(request).await;
            let mut stream = match response {
                Ok(stream) => stream,
                Err(err) => {
                    error!("Chat request failed: {err:?}");
                    yield Err(anyhow!("Chat request failed: {err}"));
                    return;
                }
            };

            while let Some(next) = stream.next().await {
                let now = Instant::now();
                let elapsed = now.duration_since(prev_time).as_millis() as f32;
                prev_time = now;

                match next {
                    Ok(chunk) => {
                        if let Some(choice) = chunk.choices.first() {
                            if first_chunk {
                                prompt_eval_latency = elapsed;
                                first_chunk = false;
                            } else {
                                completion_latency += elapsed;
                            }

                            yield Ok(Completion::Response(CompletionResponse {
                                text: choice.delta.content.clone().unwrap_or_default(),
                                finish_reason: choice.finish_reason.map(|r| r.as_str().to_string()),
                            }));
                        }

                        // Some servers send usage with the final choice, others in a
                        // separate chunk with no choices.
                        if let Some(usage) = &chunk.usage {
                            yield Ok(metrics_from(usage, prompt_eval_latency, completion_latency));
                        }
                    }
                    Err(err) => {
                        error!("Chat stream error: {err:?}");
                        yield Err(anyhow!("Chat stream error: {err}"));
                        break;
                    }
                }
            }
        };

        Box::pin(outer_stream)
    }
}
