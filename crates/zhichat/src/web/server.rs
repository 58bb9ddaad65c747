use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use axum::{Router, response::Html, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use zhichat_core::config::WebConfig;

use super::router;
use super::state::{AppState, SharedState};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub fn app(shared_state: SharedState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .nest("/api", router::router())
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Serves the chat page until the process is stopped.
pub async fn serve(config: WebConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let model_name = config.mode.model.name.clone();
    let state = AppState::new(config);
    if !state.has_api_key() {
        tracing::warn!("No API key configured, it can be entered on the chat page");
    }

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(model = %model_name, "Server listening on {local_addr}");
    println!("Chat page available at http://{local_addr}");

    let shared_state = Arc::new(RwLock::new(state));
    axum::serve(listener, app(shared_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server stopped unexpectedly")?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
