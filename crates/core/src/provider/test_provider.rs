//! A mock LLM provider for unit testing purposes.
use crate::completion::{
    ChatMessage, Completion, CompletionMetrics, CompletionModel, CompletionResponse,
    CompletionSettings,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use std::sync::Mutex;

/// What the mock model answers with.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Streams each fragment, then a stop reason and metrics.
    Text(Vec<&'static str>),
    /// Fails before any fragment.
    Error,
    /// Streams the fragments, then fails.
    TextThenError(Vec<&'static str>),
}

/// A mock `CompletionModel` that records every request it receives.
#[derive(Debug)]
pub struct TestProviderModel {
    response: MockResponse,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl TestProviderModel {
    pub fn new(response: MockResponse) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

fn fragment(text: &str, finish_reason: Option<&str>) -> Result<Completion> {
    Ok(Completion::Response(CompletionResponse {
        text: text.to_string(),
        finish_reason: finish_reason.map(str::to_string),
    }))
}

#[async_trait]
impl CompletionModel for TestProviderModel {
    fn name(&self) -> &str {
        "test-model"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _settings: &CompletionSettings,
    ) -> BoxStream<'static, Result<Completion>> {
        self.requests.lock().unwrap().push(messages.to_vec());

        let items: Vec<Result<Completion>> = match &self.response {
            MockResponse::Error => vec![Err(anyhow!("TestProviderModel error"))],
            MockResponse::Text(fragments) => {
                let mut items: Vec<_> = fragments.iter().map(|t| fragment(t, None)).collect();
                items.push(fragment("", Some("stop")));
                items.push(Ok(Completion::Metrics(CompletionMetrics::default())));
                items
            }
            MockResponse::TextThenError(fragments) => {
                let mut items: Vec<_> = fragments.iter().map(|t| fragment(t, None)).collect();
                items.push(Err(anyhow!("TestProviderModel stream broke")));
                items
            }
        };
        Box::pin(stream::iter(items))
    }
}
