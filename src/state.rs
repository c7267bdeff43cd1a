//! Process-wide state.
//!
//! One explicit context struct holds the settings and the four live
//! backends (vector store, graph store, embedder, model provider). It is
//! built once at startup; any dependency that fails to come up is
//! replaced by its fallback before traffic is accepted.

use tracing::info;

use crate::config::Settings;
use crate::embed::{select_embedder, EmbeddingBackend, StubEmbedder};
use crate::ingest::IngestService;
use crate::models::HealthReport;
use crate::providers::{
    context_for, probe_hosted, probe_llamacpp, probe_ollama, select_provider, ProviderContext,
};
use crate::store::{
    open_graph_store, open_vector_store, GraphBackend, MemoryGraphStore, MemoryVectorStore,
    VectorBackend,
};

pub struct AppState {
    pub settings: Settings,
    pub vector: VectorBackend,
    pub graph: GraphBackend,
    pub embedder: EmbeddingBackend,
    pub provider: ProviderContext,
    pub vector_fallback: bool,
    pub graph_fallback: bool,
}

impl AppState {
    /// Bring up every dependency, installing fallbacks where needed.
    pub async fn initialise(settings: Settings) -> Self {
        let (vector, vector_fallback) = open_vector_store(&settings);
        let (graph, graph_fallback) = open_graph_store(&settings).await;
        let embedder = select_embedder(&settings).await;
        let provider = select_provider(&settings).await;

        info!(
            vector = vector.name(),
            graph = graph.name(),
            embedder = embedder.name(),
            provider = provider.provider.name(),
            "state initialised"
        );

        Self {
            settings,
            vector,
            graph,
            embedder,
            provider,
            vector_fallback,
            graph_fallback,
        }
    }

    /// Fully in-memory state with no network probes. Used by tests and
    /// offline tooling.
    pub fn in_memory(settings: Settings) -> Self {
        let provider = if settings.model_provider == "auto" {
            ProviderContext::stub("auto", Some("offline state".to_string()))
        } else {
            context_for(&settings, &settings.model_provider)
                .unwrap_or_else(|_| ProviderContext::stub(&settings.model_provider, None))
        };

        Self {
            settings,
            vector: VectorBackend::Memory(MemoryVectorStore::new()),
            graph: GraphBackend::Memory(MemoryGraphStore::new()),
            embedder: EmbeddingBackend::Stub(StubEmbedder::default()),
            provider,
            vector_fallback: true,
            graph_fallback: true,
        }
    }

    /// Ingest service bound to this state's backends.
    pub fn ingest(&self) -> IngestService<'_> {
        IngestService::new(&self.settings, &self.vector, &self.graph, &self.embedder)
    }

    /// Probe every dependency and report reachability plus the active
    /// implementation names.
    pub async fn health(&self) -> HealthReport {
        let settings = &self.settings;

        let hosted_reachable = if settings.groq_api_key.is_some() {
            Some(probe_hosted(settings.groq_api_key.as_deref(), &settings.groq_api_url).await)
        } else {
            None
        };

        let vector_store_path = self
            .vector
            .path()
            .unwrap_or_else(|| settings.vector_dir.clone());

        HealthReport {
            status: "ok".to_string(),
            provider: self.provider.provider.name().to_string(),
            provider_configured: self.provider.configured.clone(),
            model_name: self.provider.model_name.clone(),
            provider_reason: self.provider.reason.clone(),
            embed_backend: self.embedder.name().to_string(),
            embed_model: self.embedder.model_name(),
            ollama_reachable: probe_ollama(&settings.ollama_host).await,
            hosted_reachable,
            llamacpp_reachable: probe_llamacpp(&settings.llamacpp_host).await,
            graph_reachable: self.graph.ping().await,
            graph_backend: self.graph.name().to_string(),
            vector_backend: self.vector.name().to_string(),
            vector_store_path_exists: vector_store_path.exists(),
            vector_store_path: vector_store_path.display().to_string(),
        }
    }

    /// Release external handles. Stores and HTTP clients close on drop;
    /// this is the explicit hook the binary calls on exit.
    pub fn shutdown(self) {
        info!("releasing store and provider handles");
        drop(self);
    }
}
