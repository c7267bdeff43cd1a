//! Shared data models for ingestion, retrieval, and answering.

use serde::{Deserialize, Serialize};

/// Metadata carried with every indexed chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub ord: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Record stored in the vector index, keyed by chunk id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// Chunk returned by a retrieval call. Lower score means closer
/// (distance semantics); callers must not assume normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Retrieval strategy chosen by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrievalMode {
    Vector,
    Graph,
    Hybrid,
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalMode::Vector => write!(f, "VECTOR"),
            RetrievalMode::Graph => write!(f, "GRAPH"),
            RetrievalMode::Hybrid => write!(f, "HYBRID"),
        }
    }
}

/// Planner output: mode, reasons, and the positive-degree entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerDecision {
    pub mode: RetrievalMode,
    pub reasons: Vec<String>,
    pub top_k: usize,
    pub entities: Vec<String>,
}

/// Citation surfaced alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    pub chunk_id: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Summary metrics returned after an ingest call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    pub chunks: usize,
    pub entities: usize,
    pub vector_count: usize,
    pub ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
}

impl IngestResult {
    pub fn empty(ms: u64) -> Self {
        Self {
            chunks: 0,
            entities: 0,
            vector_count: 0,
            ms,
            pages: None,
        }
    }
}

/// Response body for an ask call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub provider: String,
    pub question: String,
    pub citations: Vec<Citation>,
    pub planner: PlannerDecision,
    pub latency_ms: u64,
    pub confidence: f32,
}

/// Per-dependency health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub provider: String,
    pub provider_configured: String,
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_reason: Option<String>,
    pub embed_backend: String,
    pub embed_model: String,
    pub ollama_reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_reachable: Option<bool>,
    pub llamacpp_reachable: bool,
    pub graph_reachable: bool,
    pub graph_backend: String,
    pub vector_backend: String,
    pub vector_store_path: String,
    pub vector_store_path_exists: bool,
}

/// Page yielded by the out-of-scope crawler collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    pub text: String,
}
