//! Test utilities for integration tests
#![allow(dead_code)]
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{Router, body::Body};
use serde_json::json;
use zhichat::web::{AppState, SharedState, app};
use zhichat_core::config::{ModeConfig, ProfileConfig, WebConfig};
use zhichat_core::model::{ModelConfig, ModelProvider};
use zhichat_core::prompt::PromptStrategy;

pub const SYSTEM_PROMPT: &str = "你是一个有用的AI助手";

/// An env var that is never set, for tests without a credential.
pub const MISSING_KEY: &str = "env:ZHICHAT_TEST_MISSING_API_KEY";

pub fn model_config(server_uri: &str, api_key: &str) -> ModelConfig {
    ModelConfig {
        name: "glm-4".to_string(),
        provider: ModelProvider::Zhipu,
        settings: HashMap::from([
            ("base_url".to_string(), server_uri.into()),
            ("api_key".to_string(), api_key.into()),
        ]),
    }
}

pub fn mode_config(server_uri: &str, api_key: &str) -> ModeConfig {
    ModeConfig {
        model: model_config(server_uri, api_key),
        profile: ProfileConfig::default(),
        system_prompt: SYSTEM_PROMPT.to_string(),
    }
}

/// Creates the web application backed by a model served at `server_uri`.
pub fn test_app(server_uri: &str, api_key: &str) -> (Router, SharedState) {
    let config = WebConfig {
        mode: mode_config(server_uri, api_key),
        strategy: PromptStrategy::Messages,
        history_window: 10,
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let state = Arc::new(RwLock::new(AppState::new(config)));
    (app(state.clone()), state)
}

/// An OpenAI compatible event stream body with `fragments` and a final stop chunk.
pub fn event_stream_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for text in fragments {
        let event = json!({
            "id": "1",
            "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
        });
        body.push_str(&format!("data: {event}\n\n"));
    }
    let last = json!({
        "id": "1",
        "choices": [{"index": 0, "delta": {"content": ""}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 2, "total_tokens": 14}
    });
    body.push_str(&format!("data: {last}\n\ndata: [DONE]\n\n"));
    body
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Parses a server-sent events body into `(event, data)` pairs.
pub fn parse_events(body: &str) -> Vec<(String, serde_json::Value)> {
    body.split("\n\n")
        .filter_map(|raw| {
            let mut event = None;
            let mut data = None;
            for line in raw.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(payload) = line.strip_prefix("data:") {
                    data = Some(serde_json::from_str(payload.trim()).unwrap());
                }
            }
            Some((event?, data?))
        })
        .collect()
}
