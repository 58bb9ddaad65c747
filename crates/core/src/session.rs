//! A session is the conversation between a human and the model.
//!
//! [`stream_turn`] drives a single request into a [`StreamingSink`], and
//! [`Conversation`] layers the windowed history on top of it.
use futures::stream::StreamExt;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::{
    completion::{ChatMessage, Completion, CompletionMetrics, CompletionModel, CompletionSettings},
    history::{History, HistoryEntry, Role},
    prompt::{PromptStrategy, build_request},
    sink::StreamingSink,
};

#[derive(Error, Debug)]
pub enum TurnError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Failed to build the prompt: {0}")]
    Prompt(#[source] anyhow::Error),
    #[error("Request failed: {0}")]
    Request(#[source] anyhow::Error),
    #[error("Failed to display the response: {0}")]
    Display(#[source] anyhow::Error),
}

/// A completed model reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub finish_reason: Option<String>,
    pub metrics: CompletionMetrics,
}

#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Completed(Reply),
    /// The stream finished without any text.
    Empty,
}

/// Sends `messages` to `model` and feeds every fragment to `sink`.
///
/// The sink is completed only when the stream ends without error.
#[instrument(skip_all, fields(model = model.name(), messages = messages.len()))]
pub async fn stream_turn(
    model: &dyn CompletionModel,
    settings: &CompletionSettings,
    messages: &[ChatMessage],
    sink: &mut dyn StreamingSink,
) -> Result<TurnOutcome, TurnError> {
    let mut stream = model.complete(messages, settings).await;
    let mut text = String::new();
    let mut finish_reason = None;
    let mut metrics = CompletionMetrics::default();

    while let Some(next) = stream.next().await {
        match next.map_err(TurnError::Request)? {
            Completion::Response(response) => {
                if !response.text.is_empty() {
                    sink.on_fragment(&response.text)
                        .map_err(TurnError::Display)?;
                    text.push_str(&response.text);
                }
                if response.finish_reason.is_some() {
                    finish_reason = response.finish_reason;
                }
            }
            Completion::Metrics(usage) => metrics = usage,
        }
    }
    sink.on_complete().map_err(TurnError::Display)?;

    debug!(chars = text.len(), ?finish_reason, "Stream completed");
    if text.trim().is_empty() {
        warn!("Model returned an empty response");
        return Ok(TurnOutcome::Empty);
    }

    Ok(TurnOutcome::Completed(Reply {
        text,
        finish_reason,
        metrics,
    }))
}

/// Chat conversation with a bounded context window.
#[derive(Debug, Clone)]
pub struct Conversation {
    history: History,
    system_prompt: String,
    strategy: PromptStrategy,
    window: usize,
}

impl Conversation {
    pub fn new(system_prompt: &str, strategy: PromptStrategy, window: usize) -> Self {
        Self {
            history: History::new(),
            system_prompt: system_prompt.to_string(),
            strategy,
            window,
        }
    }

    /// Runs one exchange.
    ///
    /// The user entry is recorded as soon as the request is built. The
    /// assistant entry is recorded only for a completed, non-empty reply.
    pub async fn send(
        &mut self,
        model: &dyn CompletionModel,
        settings: &CompletionSettings,
        message: &str,
        sink: &mut dyn StreamingSink,
    ) -> Result<TurnOutcome, TurnError> {
        let request = self.build_request(message)?;
        self.history.push(Role::User, message);

        let outcome = stream_turn(model, settings, &request, sink).await?;
        if let TurnOutcome::Completed(reply) = &outcome {
            self.history.push(Role::Assistant, &reply.text);
        }
        Ok(outcome)
    }

    /// Request for `message` given the current history.
    pub fn build_request(&self, message: &str) -> Result<Vec<ChatMessage>, TurnError> {
        if message.trim().is_empty() {
            return Err(TurnError::EmptyMessage);
        }
        build_request(
            self.strategy,
            &self.system_prompt,
            self.history.recent(self.window),
            message,
        )
        .map_err(TurnError::Prompt)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn strategy(&self) -> PromptStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: PromptStrategy) {
        self.strategy = strategy;
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
