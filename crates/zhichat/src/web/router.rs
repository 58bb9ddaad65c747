use std::convert::Infallible;
use std::sync::RwLockReadGuard;

use anyhow::anyhow;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{KeepAlive, Sse},
    },
    routing::{get, post},
};
use tokio::sync::mpsc;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::UnboundedReceiverStream;
use zhichat_core::model::ModelInitError;
use zhichat_core::session::TurnOutcome;

use super::public::{
    ApiError, ChatRequest, MessagesResponse, SettingsRequest, SettingsResponse,
};
use super::sink::{ChannelSink, SinkEvent};
use super::state::{AppState, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/chat", post(chat_handler))
        .route(
            "/chat/messages",
            get(list_messages_handler).delete(clear_messages_handler),
        )
        .route("/settings", get(get_settings_handler).put(update_settings_handler))
}

fn read_state(state: &SharedState) -> Result<RwLockReadGuard<'_, AppState>, ApiError> {
    state
        .read()
        .map_err(|_| ApiError::from(anyhow!("Shared state is unavailable")))
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = payload.message;
    if message.trim().is_empty() {
        return Err(ApiError::bad_request("Message is empty"));
    }

    let (conversation, model, settings) = {
        let shared = read_state(&state)?;
        let model = shared.completion_model().map_err(|e| match e {
            ModelInitError::MissingCredential(_) => ApiError::bad_request(e.to_string()),
            other => ApiError::from(other),
        })?;
        (
            shared.conversation.clone(),
            model,
            shared.completion_settings(),
        )
    };

    // One turn at a time; the guard moves into the task below.
    let mut conversation = conversation
        .try_lock_owned()
        .map_err(|_| ApiError::conflict("A response is still streaming"))?;

    let (tx, rx) = mpsc::unbounded_channel::<SinkEvent>();
    tokio::spawn(async move {
        let mut sink = ChannelSink::new(tx.clone());
        let outcome = conversation
            .send(model.as_ref(), &settings, &message, &mut sink)
            .await;
        match outcome {
            Ok(TurnOutcome::Completed(reply)) => {
                tracing::info!(
                    chars = reply.text.len(),
                    entries = conversation.entries().len(),
                    "Chat turn completed"
                );
            }
            Ok(TurnOutcome::Empty) => tracing::warn!("Chat turn returned no text"),
            Err(e) => {
                tracing::error!("Chat turn failed: {e:#}");
                let _ = tx.send(SinkEvent::Error(e.to_string()));
            }
        }
    });

    let stream = UnboundedReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(event.into_event()));
    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}

async fn list_messages_handler(
    State(state): State<SharedState>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let (conversation, has_api_key) = {
        let shared = read_state(&state)?;
        (shared.conversation.clone(), shared.has_api_key())
    };
    let conversation = conversation.lock().await;

    Ok(Json(MessagesResponse {
        messages: conversation.entries().to_vec(),
        strategy: conversation.strategy(),
        has_api_key,
    }))
}

async fn clear_messages_handler(
    State(state): State<SharedState>,
) -> Result<StatusCode, ApiError> {
    let conversation = read_state(&state)?.conversation.clone();
    conversation.lock().await.clear();
    tracing::info!("Conversation cleared");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_settings_handler(
    State(state): State<SharedState>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let (conversation, model, has_api_key, has_configured_api_key) = {
        let shared = read_state(&state)?;
        (
            shared.conversation.clone(),
            shared.config.mode.model.name.clone(),
            shared.has_api_key(),
            shared.has_configured_api_key(),
        )
    };
    let conversation = conversation.lock().await;

    Ok(Json(SettingsResponse {
        model,
        strategy: conversation.strategy(),
        history_window: conversation.window(),
        has_api_key,
        has_configured_api_key,
    }))
}

async fn update_settings_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let conversation = {
        let mut shared = state
            .write()
            .map_err(|_| ApiError::from(anyhow!("Shared state is unavailable")))?;
        if let Some(api_key) = payload.api_key {
            let api_key = api_key.trim().to_string();
            shared.api_key = (!api_key.is_empty()).then_some(api_key);
            tracing::info!("API key updated from the page");
        }
        shared.conversation.clone()
    };

    if let Some(strategy) = payload.strategy {
        let mut conversation = conversation
            .try_lock()
            .map_err(|_| ApiError::conflict("A response is still streaming"))?;
        conversation.set_strategy(strategy);
        tracing::info!(strategy = strategy.as_str(), "Prompt strategy updated");
    }

    get_settings_handler(State(state)).await
}
