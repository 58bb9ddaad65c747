//! Single turn terminal chat.
//!
//! Each question is sent on its own with the system prompt; nothing is
//! remembered between questions.
use std::io::{self, Write};

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;
use zhichat_core::completion::CompletionSettings;
use zhichat_core::config::ModeConfig;
use zhichat_core::get_completion_llm;
use zhichat_core::prompt::{PromptStrategy, build_request};
use zhichat_core::session::{TurnOutcome, stream_turn};
use zhichat_core::sink::StreamingSink;

use crate::ux::{ChatMessageType, ConsoleSink, format_footer_metrics, style_chat_text};

pub const EXIT_KEYWORDS: [&str; 2] = ["quit", "退出"];

pub fn is_exit_keyword(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    EXIT_KEYWORDS.contains(&input.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Continue,
    Exit,
}

pub struct ChatLoop {
    mode: ModeConfig,
    settings: CompletionSettings,
}

impl ChatLoop {
    pub fn new(mode: ModeConfig) -> Self {
        let settings = mode.profile.clone().into();
        Self { mode, settings }
    }

    /// Streams the reply to `message` into `sink`.
    ///
    /// The model client is created per message so a credential exported
    /// while the loop runs is picked up on the next question.
    pub async fn process_message(
        &self,
        message: &str,
        sink: &mut dyn StreamingSink,
    ) -> Result<TurnOutcome> {
        let model = get_completion_llm(self.mode.model.clone(), None)?;
        let request = build_request(
            PromptStrategy::Messages,
            &self.mode.system_prompt,
            &[],
            message,
        )?;
        Ok(stream_turn(model.as_ref(), &self.settings, &request, sink).await?)
    }

    /// Handles one line of input, writing the footer or error line to `out`.
    ///
    /// A failed turn is reported and the loop goes on.
    pub async fn handle_line<W, F, O>(
        &self,
        line: &str,
        make_sink: F,
        out: &mut O,
    ) -> Result<LoopState>
    where
        W: Write + Send,
        F: FnOnce() -> ConsoleSink<W>,
        O: Write,
    {
        let input = line.trim();
        if input.is_empty() {
            return Ok(LoopState::Continue);
        }
        if is_exit_keyword(input) {
            writeln!(out, "Bye!")?;
            return Ok(LoopState::Exit);
        }

        let mut sink = make_sink();
        let outcome = self.process_message(input, &mut sink).await;
        if outcome.is_err() {
            if let Err(e) = sink.interrupt() {
                debug!("Failed to clear the partial response: {e:#}");
            }
        }
        drop(sink);

        match outcome {
            Ok(TurnOutcome::Completed(reply)) => {
                let footer = format_footer_metrics(&reply.metrics, reply.finish_reason.as_deref());
                writeln!(out)?;
                writeln!(out)?;
                writeln!(out, "{}", style_chat_text(&footer, ChatMessageType::Footer))?;
            }
            Ok(TurnOutcome::Empty) => {
                writeln!(
                    out,
                    "{}",
                    style_chat_text("◼ No response from the model.", ChatMessageType::Footer)
                )?;
            }
            Err(e) => {
                debug!("Chat turn failed: {e:#}");
                let error_msg = format!("Error: {e:#}");
                writeln!(out)?;
                writeln!(out, "{}", style_chat_text(&error_msg, ChatMessageType::Error))?;
            }
        }
        out.flush()?;
        Ok(LoopState::Continue)
    }
}

/// Runs the terminal chat until the user exits.
pub async fn execute(mode: &ModeConfig) -> Result<()> {
    let chat = ChatLoop::new(mode.clone());
    println!("Welcome to zhichat! Chatting with {}.", mode.model.name);
    println!("Type 'quit' or '退出' to exit.");

    let mut rl = DefaultEditor::new()?;
    let mut stdout = io::stdout();
    let prompt = format!("\n{}", style_chat_text("> ", ChatMessageType::Prompt));
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(&line)?;
                let state = chat
                    .handle_line(&line, ConsoleSink::stdout, &mut stdout)
                    .await?;
                if state == LoopState::Exit {
                    return Ok(());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Type 'quit' to exit.");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nBye!");
                return Ok(());
            }
            Err(err) => {
                return Err(err.into());
            }
        }
    }
}
