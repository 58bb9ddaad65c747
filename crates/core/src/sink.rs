//! Consumers of streamed completion fragments.
use anyhow::{Result, bail};

/// Shown after the partial text while a response is still streaming.
pub const IN_PROGRESS_MARKER: &str = "▌";

/// Receives the fragments of one response in order.
///
/// `on_complete` is called once after the last fragment. No call may follow it.
pub trait StreamingSink: Send {
    fn on_fragment(&mut self, fragment: &str) -> Result<()>;
    fn on_complete(&mut self) -> Result<()>;
}

/// Accumulates the text of one streaming response.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    text: String,
    completed: bool,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) -> Result<()> {
        if self.completed {
            bail!("Fragment received after the stream completed");
        }
        self.text.push_str(fragment);
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        if self.completed {
            bail!("Stream already completed");
        }
        self.completed = true;
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Text to draw: the marker trails the text until the stream completes.
    pub fn display(&self) -> String {
        if self.completed {
            self.text.clone()
        } else {
            format!("{}{IN_PROGRESS_MARKER}", self.text)
        }
    }
}
