//! Remote embedding client for the Ollama REST API.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout_sec: u64) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_sec.max(1)))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a batch of texts. Returns one vector per input text.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingsRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .http
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Ollama embeddings request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Ollama embeddings error {status}: {body}"
            )));
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Invalid embeddings response: {e}")))?;

        let vectors = payload.into_vectors().ok_or_else(|| {
            Error::Provider("Ollama embeddings response missing vectors".to_string())
        })?;

        if vectors.len() != texts.len() {
            return Err(Error::Provider(format!(
                "Ollama returned {} embeddings for {} texts",
                vectors.len(),
                texts.len()
            )));
        }

        Ok(vectors)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

/// The embeddings endpoint has grown several shapes across Ollama
/// releases; accept each of them.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    data: Option<Vec<EmbeddingItem>>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl EmbeddingsResponse {
    fn into_vectors(self) -> Option<Vec<Vec<f32>>> {
        if let Some(embeddings) = self.embeddings {
            return Some(embeddings);
        }
        if let Some(data) = self.data {
            return Some(data.into_iter().map(|item| item.embedding).collect());
        }
        self.embedding.map(|single| vec![single])
    }
}
