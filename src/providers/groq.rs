//! Adapter for Groq's OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

const SYSTEM_PROMPT: &str = "You are DeskMate, a precise service desk copilot.";

#[derive(Debug, Clone)]
pub struct GroqProvider {
    http: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl GroqProvider {
    pub fn new(api_key: &str, api_url: &str, model: &str, timeout_sec: u64) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_sec.max(1)))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key: api_key.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.0,
            max_tokens: 512,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Groq request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Groq error {status}: {body}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Invalid Groq response: {e}")))?;

        let content = extract_content(&payload)
            .ok_or_else(|| Error::Provider("Groq response missing content".to_string()))?;

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(Error::Provider("Groq response missing content".to_string()));
        }
        Ok(trimmed.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// The hosted API responds with either a full message or a streaming-style
/// delta; accept both, plus a top-level message string.
fn extract_content(payload: &Value) -> Option<&str> {
    let first = payload.get("choices")?.as_array()?.first();
    if let Some(choice) = first {
        if let Some(content) = choice.pointer("/delta/content").and_then(Value::as_str) {
            return Some(content);
        }
        if let Some(content) = choice.pointer("/message/content").and_then(Value::as_str) {
            return Some(content);
        }
    }
    payload.get("message").and_then(Value::as_str)
}
