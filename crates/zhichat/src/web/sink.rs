use anyhow::Result;
use axum::response::sse::Event;
use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use zhichat_core::sink::{StreamBuffer, StreamingSink};

/// What the page receives while a response streams.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// Everything received so far, followed by the in-progress marker.
    Fragment(String),
    /// The final text; empty when the model returned nothing.
    Done(String),
    Error(String),
}

impl SinkEvent {
    pub fn into_event(self) -> Event {
        match self {
            SinkEvent::Fragment(text) => Event::default()
                .event("fragment")
                .data(json!({ "text": text }).to_string()),
            SinkEvent::Done(text) => Event::default()
                .event("done")
                .data(json!({ "text": text }).to_string()),
            SinkEvent::Error(message) => Event::default()
                .event("error")
                .data(json!({ "message": message }).to_string()),
        }
    }
}

/// Streams redraws of the response region to an SSE channel.
pub struct ChannelSink {
    tx: UnboundedSender<SinkEvent>,
    buffer: StreamBuffer,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<SinkEvent>) -> Self {
        Self {
            tx,
            buffer: StreamBuffer::new(),
        }
    }

    fn send(&self, event: SinkEvent) {
        // The turn runs to completion even if the page went away.
        if self.tx.send(event).is_err() {
            debug!("Client disconnected, response still streaming");
        }
    }
}

impl StreamingSink for ChannelSink {
    fn on_fragment(&mut self, fragment: &str) -> Result<()> {
        self.buffer.push(fragment)?;
        self.send(SinkEvent::Fragment(self.buffer.display()));
        Ok(())
    }

    fn on_complete(&mut self) -> Result<()> {
        self.buffer.complete()?;
        self.send(SinkEvent::Done(self.buffer.text().to_string()));
        Ok(())
    }
}
