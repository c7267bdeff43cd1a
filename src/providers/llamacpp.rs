//! Adapter for the llama.cpp REST-compatible server.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct LlamaCppProvider {
    http: Client,
    base_url: String,
    model: Option<String>,
}

impl LlamaCppProvider {
    pub fn new(base_url: &str, model: Option<&str>, timeout_sec: u64) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_sec.max(1)))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.map(|m| m.to_string()),
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let mut payload = json!({
            "prompt": prompt,
            "temperature": 0,
            "stream": false,
            "n_predict": 256,
        });
        if let Some(model) = &self.model {
            payload["model"] = json!(model);
        }

        let response = self
            .http
            .post(format!("{}/completion", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("llama.cpp request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "llama.cpp error {status}: {body}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Invalid llama.cpp response: {e}")))?;

        let text = extract_text(&payload)
            .ok_or_else(|| Error::Provider("llama.cpp response missing text".to_string()))?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::Provider(
                "llama.cpp response missing text".to_string(),
            ));
        }
        Ok(trimmed.to_string())
    }
}

/// Completion servers disagree on the response field; probe the known ones.
fn extract_text(payload: &Value) -> Option<&str> {
    if let Some(content) = payload.get("content").and_then(Value::as_str) {
        return Some(content);
    }
    if let Some(text) = payload.get("text").and_then(Value::as_str) {
        return Some(text);
    }
    let choice = payload.get("choices")?.as_array()?.first()?;
    if let Some(text) = choice.get("text").and_then(Value::as_str) {
        return Some(text);
    }
    choice.pointer("/message/content").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider(server: &MockServer) -> LlamaCppProvider {
        LlamaCppProvider::new(&server.base_url(), None, 5)
    }

    #[tokio::test]
    async fn generate_reads_content_field() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/completion");
            then.status(200).json_body(json!({ "content": "Check the cable." }));
        });

        let text = provider(&server).generate("network down").await.unwrap();
        assert_eq!(text, "Check the cable.");
    }

    #[tokio::test]
    async fn generate_reads_choices_text() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/completion");
            then.status(200)
                .json_body(json!({ "choices": [{ "text": "Use the portal." }] }));
        });

        let text = provider(&server).generate("q").await.unwrap();
        assert_eq!(text, "Use the portal.");
    }

    #[tokio::test]
    async fn model_is_included_when_configured() {
        let server = MockServer::start_async().await;

        let mock = server.mock(|when, then| {
            when.method(POST).path("/completion").matches(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body().as_ref()).unwrap();
                body["model"] == "tiny-llama"
            });
            then.status(200).json_body(json!({ "content": "ok" }));
        });

        LlamaCppProvider::new(&server.base_url(), Some("tiny-llama"), 5)
            .generate("q")
            .await
            .unwrap();
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn http_failure_is_a_provider_error() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/completion");
            then.status(503).body("loading");
        });

        let err = provider(&server).generate("q").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn missing_text_is_a_provider_error() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/completion");
            then.status(200).json_body(json!({ "tokens_evaluated": 12 }));
        });

        let err = provider(&server).generate("q").await.unwrap_err();
        assert!(err.to_string().contains("missing text"));
    }
}
