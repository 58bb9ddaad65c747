//! Web chat page served over HTTP with server-sent events for streaming.
pub mod public;
mod router;
mod server;
mod sink;
mod state;

pub use server::{app, serve};
pub use sink::{ChannelSink, SinkEvent};
pub use state::{AppState, SharedState};
