//! Retrieval executor.
//!
//! Runs the planner's decision against the stores with a defined fallback
//! lattice:
//! - GRAPH with no results falls back to vector search
//! - HYBRID with no graph results falls back to vector search
//! - HYBRID with an empty graph-vector intersection returns the vector
//!   results unfiltered
//! - HYBRID with an empty vector side keeps the graph results
//!
//! Results stay in the order the primary source produced them, and every
//! fallback is recorded so callers can surface the reason. Store failures
//! mid-ask are logged and treated as empty results, never propagated.

use tracing::warn;

use crate::embed::EmbeddingBackend;
use crate::models::{PlannerDecision, RetrievalMode, RetrievedChunk};
use crate::store::{GraphBackend, VectorBackend};

/// Retrieval output: ranked chunks plus the fallback note, if one fired.
#[derive(Debug)]
pub struct Retrieval {
    pub chunks: Vec<RetrievedChunk>,
    pub fallback: Option<String>,
}

pub struct Retriever<'a> {
    vector: &'a VectorBackend,
    graph: &'a GraphBackend,
    embedder: &'a EmbeddingBackend,
}

impl<'a> Retriever<'a> {
    pub fn new(
        vector: &'a VectorBackend,
        graph: &'a GraphBackend,
        embedder: &'a EmbeddingBackend,
    ) -> Self {
        Self {
            vector,
            graph,
            embedder,
        }
    }

    pub async fn retrieve(&self, question: &str, decision: &PlannerDecision) -> Retrieval {
        match decision.mode {
            RetrievalMode::Vector => Retrieval {
                chunks: self.vector_search(question, decision.top_k).await,
                fallback: None,
            },
            RetrievalMode::Graph => {
                let graph_hits = self.graph_search(&decision.entities, decision.top_k).await;
                if graph_hits.is_empty() {
                    Retrieval {
                        chunks: self.vector_search(question, decision.top_k).await,
                        fallback: Some("graph returned no chunks; fell back to vector".to_string()),
                    }
                } else {
                    Retrieval {
                        chunks: graph_hits,
                        fallback: None,
                    }
                }
            }
            RetrievalMode::Hybrid => self.hybrid_search(question, decision).await,
        }
    }

    async fn hybrid_search(&self, question: &str, decision: &PlannerDecision) -> Retrieval {
        let graph_hits = self.graph_search(&decision.entities, decision.top_k).await;
        if graph_hits.is_empty() {
            return Retrieval {
                chunks: self.vector_search(question, decision.top_k).await,
                fallback: Some("graph returned no chunks; fell back to vector".to_string()),
            };
        }

        let vector_hits = self.vector_search(question, decision.top_k).await;
        if vector_hits.is_empty() {
            return Retrieval {
                chunks: graph_hits,
                fallback: Some("vector returned no chunks; kept graph results".to_string()),
            };
        }

        let allowed: std::collections::HashSet<&str> =
            graph_hits.iter().map(|hit| hit.id.as_str()).collect();
        let filtered: Vec<RetrievedChunk> = vector_hits
            .iter()
            .filter(|hit| allowed.contains(hit.id.as_str()))
            .cloned()
            .collect();

        if filtered.is_empty() {
            Retrieval {
                chunks: vector_hits,
                fallback: Some(
                    "empty graph-vector intersection; returned vector results".to_string(),
                ),
            }
        } else {
            Retrieval {
                chunks: filtered,
                fallback: None,
            }
        }
    }

    /// Top-k chunks by embedding distance. Embedding or store failures
    /// degrade to an empty result.
    async fn vector_search(&self, question: &str, top_k: usize) -> Vec<RetrievedChunk> {
        let embedding = match self.embedder.embed(&[question.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => return Vec::new(),
            Err(err) => {
                warn!(%err, "query embedding failed; vector search empty");
                return Vec::new();
            }
        };

        match self.vector.search(&embedding, top_k) {
            Ok(hits) => hits,
            Err(err) => {
                warn!(%err, "vector search failed; treating as empty");
                Vec::new()
            }
        }
    }

    async fn graph_search(&self, entities: &[String], top_k: usize) -> Vec<RetrievedChunk> {
        if entities.is_empty() {
            return Vec::new();
        }
        match self.graph.chunks_for_entities(entities, top_k).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(%err, "graph retrieval failed; treating as empty");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::embed::StubEmbedder;
    use crate::ingest::IngestService;
    use crate::models::RetrievalMode;
    use crate::store::{MemoryGraphStore, MemoryVectorStore};

    struct Fixture {
        settings: Settings,
        vector: VectorBackend,
        graph: GraphBackend,
        embedder: EmbeddingBackend,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                settings: Settings {
                    chunk_tokens: 16,
                    chunk_overlap: 4,
                    ..Settings::offline()
                },
                vector: VectorBackend::Memory(MemoryVectorStore::new()),
                graph: GraphBackend::Memory(MemoryGraphStore::new()),
                embedder: EmbeddingBackend::Stub(StubEmbedder::default()),
            }
        }

        async fn ingest(&self, title: &str, text: &str) {
            IngestService::new(&self.settings, &self.vector, &self.graph, &self.embedder)
                .ingest_text(Some(title), text)
                .await
                .unwrap();
        }

        fn retriever(&self) -> Retriever<'_> {
            Retriever::new(&self.vector, &self.graph, &self.embedder)
        }
    }

    fn decision(mode: RetrievalMode, entities: &[&str]) -> PlannerDecision {
        PlannerDecision {
            mode,
            reasons: Vec::new(),
            top_k: 6,
            entities: entities.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn vector_mode_ranks_overlapping_vocabulary_first() {
        let fx = Fixture::new();
        fx.ingest("Widgets 101", "A widget has parts A and B. Part A connects to Part B.")
            .await;
        fx.ingest("Badgers", "Badgers dig large burrows under hedgerows.").await;

        let retrieval = fx
            .retriever()
            .retrieve("widget parts", &decision(RetrievalMode::Vector, &[]))
            .await;

        assert!(!retrieval.chunks.is_empty());
        assert!(retrieval.fallback.is_none());
        assert_eq!(
            retrieval.chunks[0].metadata.title.as_deref(),
            Some("Widgets 101")
        );
    }

    #[tokio::test]
    async fn graph_mode_returns_entity_chunks() {
        let fx = Fixture::new();
        fx.ingest("Widgets 101", "Part A connects to Part B for safety.").await;

        let retrieval = fx
            .retriever()
            .retrieve("irrelevant", &decision(RetrievalMode::Graph, &["part a"]))
            .await;

        assert_eq!(retrieval.chunks.len(), 1);
        assert!(retrieval.fallback.is_none());
    }

    #[tokio::test]
    async fn graph_mode_falls_back_to_vector_when_empty() {
        let fx = Fixture::new();
        fx.ingest("Widgets 101", "Part A connects to Part B for safety.").await;

        let retrieval = fx
            .retriever()
            .retrieve("Widgets", &decision(RetrievalMode::Graph, &["ghost"]))
            .await;

        assert!(!retrieval.chunks.is_empty());
        assert!(retrieval
            .fallback
            .as_deref()
            .unwrap()
            .contains("fell back to vector"));
    }

    #[tokio::test]
    async fn hybrid_intersects_vector_and_graph() {
        let fx = Fixture::new();
        fx.ingest("Widgets 101", "Part A connects to Part B for safety.").await;
        fx.ingest("Badgers", "Badgers dig large burrows under hedgerows.").await;

        let retrieval = fx
            .retriever()
            .retrieve(
                "How does part a work?",
                &decision(RetrievalMode::Hybrid, &["part a"]),
            )
            .await;

        assert!(retrieval.fallback.is_none());
        // Every hybrid result must also be reachable through the graph.
        let graph_hits = fx
            .graph
            .chunks_for_entities(&["part a".to_string()], 6)
            .await
            .unwrap();
        let graph_ids: Vec<&str> = graph_hits.iter().map(|hit| hit.id.as_str()).collect();
        assert!(!retrieval.chunks.is_empty());
        for chunk in &retrieval.chunks {
            assert!(graph_ids.contains(&chunk.id.as_str()));
        }
    }

    #[tokio::test]
    async fn hybrid_preserves_vector_order() {
        let fx = Fixture::new();
        fx.ingest("Widgets 101", "Part A connects to Part B for safety checks.")
            .await;

        let retrieval = fx
            .retriever()
            .retrieve(
                "Part A safety",
                &decision(RetrievalMode::Hybrid, &["part a", "safety"]),
            )
            .await;

        let vector_hits = fx.retriever().vector_search("Part A safety", 6).await;
        let vector_order: Vec<&str> = vector_hits
            .iter()
            .map(|hit| hit.id.as_str())
            .filter(|id| retrieval.chunks.iter().any(|c| c.id == *id))
            .collect();
        let hybrid_order: Vec<&str> = retrieval.chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(hybrid_order, vector_order);
    }

    #[tokio::test]
    async fn hybrid_falls_back_to_vector_when_graph_empty() {
        let fx = Fixture::new();
        fx.ingest("Widgets 101", "Part A connects to Part B for safety.").await;

        let retrieval = fx
            .retriever()
            .retrieve("Widgets", &decision(RetrievalMode::Hybrid, &[]))
            .await;

        assert!(!retrieval.chunks.is_empty());
        assert!(retrieval
            .fallback
            .as_deref()
            .unwrap()
            .contains("graph returned no chunks"));
    }

    #[tokio::test]
    async fn hybrid_keeps_graph_results_when_vector_store_purged() {
        let fx = Fixture::new();
        fx.ingest("Widgets 101", "Part A connects to Part B for safety.").await;
        fx.vector.clear().unwrap();

        let retrieval = fx
            .retriever()
            .retrieve(
                "Part A",
                &decision(RetrievalMode::Hybrid, &["part a"]),
            )
            .await;

        assert!(!retrieval.chunks.is_empty());
        assert!(retrieval
            .fallback
            .as_deref()
            .unwrap()
            .contains("kept graph results"));
    }

    #[tokio::test]
    async fn empty_stores_return_empty_results() {
        let fx = Fixture::new();
        let retrieval = fx
            .retriever()
            .retrieve("anything", &decision(RetrievalMode::Vector, &[]))
            .await;
        assert!(retrieval.chunks.is_empty());
    }
}
