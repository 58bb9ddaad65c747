//! Request construction from a system prompt, recent history and a new message.
use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

use crate::completion::{ChatMessage, SenderType};
use crate::history::HistoryEntry;

const FLATTENED_TEMPLATE: &str = "{% for entry in history %}\
{% if entry.role == \"user\" %}用户{% else %}助手{% endif %}: {{ entry.text }}\n\
{% endfor %}用户: {{ message }}\n助手: ";

/// How the conversation window is laid out in the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStrategy {
    /// One message per history entry, tagged with its role.
    #[default]
    Messages,
    /// The window and new message rendered into a single user prompt.
    Flattened,
}

impl PromptStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStrategy::Messages => "messages",
            PromptStrategy::Flattened => "flattened",
        }
    }
}

/// Builds the messages for a request.
///
/// `recent` holds the already windowed history preceding `message`.
pub fn build_request(
    strategy: PromptStrategy,
    system_prompt: &str,
    recent: &[HistoryEntry],
    message: &str,
) -> Result<Vec<ChatMessage>> {
    let mut messages = Vec::with_capacity(recent.len() + 2);
    if !system_prompt.is_empty() {
        messages.push(ChatMessage::new(SenderType::System, system_prompt));
    }

    match strategy {
        PromptStrategy::Messages => {
            messages.extend(
                recent
                    .iter()
                    .map(|entry| ChatMessage::new(entry.role.into(), entry.text.as_str())),
            );
            messages.push(ChatMessage::new(SenderType::User, message));
        }
        PromptStrategy::Flattened => {
            let prompt = render_flattened(recent, message)?;
            messages.push(ChatMessage::new(SenderType::User, prompt));
        }
    }

    Ok(messages)
}

fn render_flattened(recent: &[HistoryEntry], message: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("flattened", FLATTENED_TEMPLATE)
        .context("Invalid flattened prompt template")?;
    let template = env.get_template("flattened")?;
    template
        .render(context! { history => recent, message => message })
        .context("Failed to render flattened prompt")
}
