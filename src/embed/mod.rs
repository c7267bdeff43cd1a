//! Embedding providers.
//!
//! A sealed enum over the backends the deployment can run:
//! - `Ollama`: remote HTTP embedder
//! - `Stub`: deterministic hash-seeded unit vectors (offline fallback)
//!
//! Selection happens once at startup; per-request failures are surfaced to
//! the caller, not retried here.

pub mod ollama;
pub mod stub;

pub use ollama::OllamaEmbedder;
pub use stub::{StubEmbedder, STUB_EMBED_DIM};

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::providers::probe_ollama;

#[derive(Debug, Clone)]
pub enum EmbeddingBackend {
    Ollama(OllamaEmbedder),
    Stub(StubEmbedder),
}

impl EmbeddingBackend {
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            EmbeddingBackend::Ollama(client) => client.embed_texts(texts).await,
            EmbeddingBackend::Stub(stub) => Ok(stub.embed_texts(texts)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbeddingBackend::Ollama(_) => "ollama",
            EmbeddingBackend::Stub(_) => "stub",
        }
    }

    pub fn model_name(&self) -> String {
        match self {
            EmbeddingBackend::Ollama(client) => client.model().to_string(),
            EmbeddingBackend::Stub(stub) => format!("stub-{}d", stub.dimension()),
        }
    }
}

/// Choose the embedding backend from settings. `auto` probes Ollama and
/// falls back to the stub; an explicit choice is honored as-is.
pub async fn select_embedder(settings: &Settings) -> EmbeddingBackend {
    match settings.embed_provider.as_str() {
        "ollama" => EmbeddingBackend::Ollama(OllamaEmbedder::new(
            &settings.ollama_host,
            &settings.embed_model,
            settings.model_timeout_sec,
        )),
        "stub" => EmbeddingBackend::Stub(StubEmbedder::default()),
        _ => {
            if probe_ollama(&settings.ollama_host).await {
                info!(host = %settings.ollama_host, model = %settings.embed_model,
                    "using Ollama embeddings");
                EmbeddingBackend::Ollama(OllamaEmbedder::new(
                    &settings.ollama_host,
                    &settings.embed_model,
                    settings.model_timeout_sec,
                ))
            } else {
                warn!("Ollama unreachable; using stub embeddings");
                EmbeddingBackend::Stub(StubEmbedder::default())
            }
        }
    }
}
