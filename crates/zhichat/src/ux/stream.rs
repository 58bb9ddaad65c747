use std::io::Write;

use anyhow::Result;
use console::Term;
use zhichat_core::sink::{IN_PROGRESS_MARKER, StreamBuffer, StreamingSink};

use super::GenerationSpinner;

// Backspace over the marker, blank it, and step back again.
const ERASE_MARKER: &str = "\u{8} \u{8}";

/// Streams a response to a terminal or any other writer.
///
/// Only the new fragment is written on each update; the marker is erased and
/// redrawn after it so the visible text always equals the buffer plus marker.
pub struct ConsoleSink<W: Write + Send> {
    writer: W,
    buffer: StreamBuffer,
    show_marker: bool,
    marker_drawn: bool,
    spinner: Option<GenerationSpinner>,
}

impl ConsoleSink<Term> {
    /// Sink for stdout. The marker and spinner are only used on a terminal.
    pub fn stdout() -> Self {
        let term = Term::stdout();
        let is_term = term.is_term();
        let spinner = is_term.then(|| GenerationSpinner::new("Generating...".to_string()));
        Self {
            writer: term,
            buffer: StreamBuffer::new(),
            show_marker: is_term,
            marker_drawn: false,
            spinner,
        }
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(writer: W, show_marker: bool) -> Self {
        Self {
            writer,
            buffer: StreamBuffer::new(),
            show_marker,
            marker_drawn: false,
            spinner: None,
        }
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Clears the spinner and marker of a response that failed before completing.
    pub fn interrupt(&mut self) -> Result<()> {
        if !self.buffer.is_completed() {
            self.clear_spinner();
            self.erase_marker()?;
            self.writer.flush()?;
        }
        Ok(())
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.clear();
        }
    }

    fn erase_marker(&mut self) -> Result<()> {
        if self.marker_drawn {
            self.writer.write_all(ERASE_MARKER.as_bytes())?;
            self.marker_drawn = false;
        }
        Ok(())
    }
}

impl<W: Write + Send> StreamingSink for ConsoleSink<W> {
    fn on_fragment(&mut self, fragment: &str) -> Result<()> {
        self.buffer.push(fragment)?;
        self.clear_spinner();
        self.erase_marker()?;
        self.writer.write_all(fragment.as_bytes())?;
        if self.show_marker {
            self.writer.write_all(IN_PROGRESS_MARKER.as_bytes())?;
            self.marker_drawn = true;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn on_complete(&mut self) -> Result<()> {
        self.buffer.complete()?;
        self.clear_spinner();
        self.erase_marker()?;
        self.writer.flush()?;
        Ok(())
    }
}
