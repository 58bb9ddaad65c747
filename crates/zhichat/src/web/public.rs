//! Public API types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use zhichat_core::history::HistoryEntry;
use zhichat_core::prompt::PromptStrategy;

// Errors

pub struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: anyhow::Error::msg(message.into()),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            error: anyhow::Error::msg(message.into()),
        }
    }
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{:#}", self.error);
        } else {
            tracing::warn!("{}", self.error);
        }

        (self.status, Json(json!({ "error": self.error.to_string() }))).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_, anyhow::Error>`;
/// anything not mapped explicitly is an internal error.
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}

// Chat

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<HistoryEntry>,
    pub strategy: PromptStrategy,
    pub has_api_key: bool,
}

// Settings

#[derive(Deserialize)]
pub struct SettingsRequest {
    /// An empty key removes a previously entered one.
    pub api_key: Option<String>,
    pub strategy: Option<PromptStrategy>,
}

#[derive(Serialize)]
pub struct SettingsResponse {
    pub model: String,
    pub strategy: PromptStrategy,
    pub history_window: usize,
    pub has_api_key: bool,
    /// False when the only key is the one entered on the page.
    pub has_configured_api_key: bool,
}
