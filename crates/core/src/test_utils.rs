//! Test utilities for zhichat-core crate
//!
//! Common helpers for config files and model configurations used across the
//! unit tests.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::Builder;

/// Creates a temporary config file with the given content.
/// Uses tempfile::Builder to ensure unique directories for parallel tests.
///
/// # Panics
/// Panics if temp directory creation or file writing fails.
pub fn create_temp_config(content: &str) -> PathBuf {
    let temp_dir = Builder::new()
        .prefix("zhichat-test")
        .rand_bytes(8)
        .tempdir()
        .unwrap();
    let config_path = temp_dir.path().join("zhichat.yml");
    File::create(&config_path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
    // Keep the temp directory alive by leaking it (this is just for tests)
    let _ = Box::leak(Box::new(temp_dir));
    config_path
}

/// Default test model configuration for testing.
pub fn dummy_model_config(name: &str) -> crate::model::ModelConfig {
    crate::model::ModelConfig {
        name: name.to_string(),
        provider: crate::model::ModelProvider::Zhipu,
        settings: std::collections::HashMap::from([(
            "api_key".to_string(),
            serde_yaml::Value::String("sk-dummy".to_string()),
        )]),
    }
}

/// An OpenAI compatible server-sent events body streaming `fragments`.
pub fn mock_event_stream_body(fragments: &[&str]) -> String {
    let mut events: Vec<serde_json::Value> = fragments
        .iter()
        .map(|text| {
            serde_json::json!({
                "id": "chatcmpl-1",
                "created": 1684,
                "model": "glm-4",
                "choices": [{
                    "index": 0,
                    "delta": {"role": "assistant", "content": text},
                    "finish_reason": serde_json::Value::Null
                }]
            })
        })
        .collect();
    events.push(serde_json::json!({
        "id": "chatcmpl-1",
        "created": 1684,
        "model": "glm-4",
        "choices": [{
            "index": 0,
            "delta": {"role": "assistant", "content": ""},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 20,
            "completion_tokens": 30,
            "total_tokens": 50
        }
    }));

    let mut body = events
        .into_iter()
        .map(|event| format!("data: {}\n\n", serde_json::to_string(&event).unwrap()))
        .collect::<String>();
    body.push_str("data: [DONE]\n\n");
    body
}
