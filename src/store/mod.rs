//! Vector and graph stores.
//!
//! Each contract has a persistent implementation and an in-memory
//! fallback behind one enum, so downstream code treats both uniformly.
//! Construction is a single call site returning `(store, is_fallback)`;
//! fallback activation happens once, at startup, before traffic.

pub mod graph_memory;
pub mod graph_neo4j;
pub mod vector_memory;
pub mod vector_sqlite;

pub use graph_memory::MemoryGraphStore;
pub use graph_neo4j::Neo4jGraphStore;
pub use vector_memory::MemoryVectorStore;
pub use vector_sqlite::SqliteVectorStore;

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;

use crate::config::Settings;
use crate::error::Result;
use crate::models::{RetrievedChunk, VectorRecord};

pub enum VectorBackend {
    Sqlite(SqliteVectorStore),
    Memory(MemoryVectorStore),
}

impl VectorBackend {
    pub fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        match self {
            VectorBackend::Sqlite(store) => store.upsert(records),
            VectorBackend::Memory(store) => store.upsert(records),
        }
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        match self {
            VectorBackend::Sqlite(store) => store.search(query, k),
            VectorBackend::Memory(store) => store.search(query, k),
        }
    }

    pub fn ping(&self) -> bool {
        match self {
            VectorBackend::Sqlite(store) => store.ping(),
            VectorBackend::Memory(store) => store.ping(),
        }
    }

    pub fn clear(&self) -> Result<()> {
        match self {
            VectorBackend::Sqlite(store) => store.clear(),
            VectorBackend::Memory(store) => store.clear(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VectorBackend::Sqlite(_) => "sqlite",
            VectorBackend::Memory(_) => "memory",
        }
    }

    pub fn path(&self) -> Option<PathBuf> {
        match self {
            VectorBackend::Sqlite(store) => Some(store.path().to_path_buf()),
            VectorBackend::Memory(_) => None,
        }
    }
}

pub enum GraphBackend {
    Neo4j(Neo4jGraphStore),
    Memory(MemoryGraphStore),
}

impl GraphBackend {
    pub async fn upsert_document(&self, doc_id: &str, title: Option<&str>) -> Result<()> {
        match self {
            GraphBackend::Neo4j(store) => store.upsert_document(doc_id, title).await,
            GraphBackend::Memory(store) => store.upsert_document(doc_id, title),
        }
    }

    pub async fn upsert_chunk(
        &self,
        chunk_id: &str,
        doc_id: &str,
        ord: usize,
        text: &str,
        tokens: usize,
    ) -> Result<()> {
        match self {
            GraphBackend::Neo4j(store) => {
                store.upsert_chunk(chunk_id, doc_id, ord, text, tokens).await
            }
            GraphBackend::Memory(store) => store.upsert_chunk(chunk_id, doc_id, ord, text, tokens),
        }
    }

    pub async fn link_doc_chunk(&self, doc_id: &str, chunk_id: &str) -> Result<()> {
        match self {
            GraphBackend::Neo4j(store) => store.link_doc_chunk(doc_id, chunk_id).await,
            GraphBackend::Memory(store) => store.link_doc_chunk(doc_id, chunk_id),
        }
    }

    pub async fn upsert_entity(&self, key: &str, display_name: &str) -> Result<String> {
        match self {
            GraphBackend::Neo4j(store) => store.upsert_entity(key, display_name).await,
            GraphBackend::Memory(store) => store.upsert_entity(key, display_name),
        }
    }

    pub async fn link_chunk_entity(
        &self,
        chunk_id: &str,
        entity_key: &str,
        rel: &str,
    ) -> Result<()> {
        match self {
            GraphBackend::Neo4j(store) => store.link_chunk_entity(chunk_id, entity_key, rel).await,
            GraphBackend::Memory(store) => store.link_chunk_entity(chunk_id, entity_key, rel),
        }
    }

    pub async fn degrees(&self, entity_keys: &[String]) -> Result<HashMap<String, usize>> {
        match self {
            GraphBackend::Neo4j(store) => store.degrees(entity_keys).await,
            GraphBackend::Memory(store) => store.degrees(entity_keys),
        }
    }

    pub async fn chunks_for_entities(
        &self,
        entity_keys: &[String],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        match self {
            GraphBackend::Neo4j(store) => store.chunks_for_entities(entity_keys, limit).await,
            GraphBackend::Memory(store) => store.chunks_for_entities(entity_keys, limit),
        }
    }

    pub async fn ping(&self) -> bool {
        match self {
            GraphBackend::Neo4j(store) => store.ping().await,
            GraphBackend::Memory(store) => store.ping(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GraphBackend::Neo4j(_) => "neo4j",
            GraphBackend::Memory(_) => "memory",
        }
    }
}

/// Open the persistent vector store, installing the in-memory fallback on
/// failure. Returns the store and whether the fallback was activated.
pub fn open_vector_store(settings: &Settings) -> (VectorBackend, bool) {
    match SqliteVectorStore::open(&settings.vector_dir) {
        Ok(store) => (VectorBackend::Sqlite(store), false),
        Err(err) => {
            warn!(%err, dir = %settings.vector_dir.display(),
                "vector store unavailable; using in-memory fallback");
            (VectorBackend::Memory(MemoryVectorStore::new()), true)
        }
    }
}

/// Connect to Neo4j and bootstrap constraints, installing the in-memory
/// fallback on failure.
pub async fn open_graph_store(settings: &Settings) -> (GraphBackend, bool) {
    match Neo4jGraphStore::connect(
        &settings.graph_uri,
        &settings.graph_user,
        &settings.graph_password,
    )
    .await
    {
        Ok(store) => match store.ensure_constraints().await {
            Ok(()) => (GraphBackend::Neo4j(store), false),
            Err(err) => {
                warn!(%err, "graph constraint bootstrap failed; using in-memory fallback");
                (GraphBackend::Memory(MemoryGraphStore::new()), true)
            }
        },
        Err(err) => {
            warn!(%err, uri = %settings.graph_uri,
                "graph store unavailable; using in-memory fallback");
            (GraphBackend::Memory(MemoryGraphStore::new()), true)
        }
    }
}

/// Restrict relationship labels to `[A-Z_]`, defaulting to ABOUT.
pub(crate) fn sanitize_rel(rel: &str) -> String {
    let candidate = rel.trim().to_uppercase();
    if !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '_')
    {
        candidate
    } else {
        "ABOUT".to_string()
    }
}

/// Cosine distance: 0 for identical directions, growing as vectors
/// diverge. Mismatched or zero vectors count as maximally distant.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 1.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sanitize_rel_accepts_upper_snake() {
        assert_eq!(sanitize_rel("ABOUT"), "ABOUT");
        assert_eq!(sanitize_rel("about"), "ABOUT");
        assert_eq!(sanitize_rel("HAS_CHUNK"), "HAS_CHUNK");
    }

    #[test]
    fn sanitize_rel_rejects_injection_attempts() {
        assert_eq!(sanitize_rel("ABOUT]->(x) DELETE x //"), "ABOUT");
        assert_eq!(sanitize_rel(""), "ABOUT");
        assert_eq!(sanitize_rel("rel-1"), "ABOUT");
    }

    #[test]
    fn cosine_distance_basics() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_degenerate_inputs() {
        assert_eq!(cosine_distance(&[], &[]), 1.0);
        assert_eq!(cosine_distance(&[1.0], &[1.0, 2.0]), 1.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn vector_backend_reports_variant_name_and_path() {
        let memory = VectorBackend::Memory(MemoryVectorStore::new());
        assert_eq!(memory.name(), "memory");
        assert!(memory.path().is_none());
    }

    #[test]
    fn open_vector_store_falls_back_on_unwritable_dir() {
        let settings = Settings {
            vector_dir: PathBuf::from("/proc/deskmate-definitely-unwritable"),
            ..Settings::offline()
        };
        let (store, is_fallback) = open_vector_store(&settings);
        assert!(is_fallback);
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn open_vector_store_uses_sqlite_when_writable() {
        let dir = std::env::temp_dir().join(format!("deskmate_open_{}", uuid::Uuid::new_v4()));
        let settings = Settings {
            vector_dir: dir.clone(),
            ..Settings::offline()
        };
        let (store, is_fallback) = open_vector_store(&settings);
        assert!(!is_fallback);
        assert_eq!(store.name(), "sqlite");
        assert!(store.path().unwrap().starts_with(&dir));

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn open_graph_store_falls_back_when_unreachable() {
        let settings = Settings {
            graph_uri: "bolt://127.0.0.1:1".to_string(),
            ..Settings::offline()
        };
        let (store, is_fallback) = open_graph_store(&settings).await;
        assert!(is_fallback);
        assert_eq!(store.name(), "memory");
        assert!(store.ping().await);
    }

    #[tokio::test]
    async fn graph_backend_dispatches_to_memory() {
        let store = GraphBackend::Memory(MemoryGraphStore::new());
        store.upsert_document("d", Some("T")).await.unwrap();
        store.upsert_chunk("d-0", "d", 0, "alpha beta", 2).await.unwrap();
        store.link_doc_chunk("d", "d-0").await.unwrap();
        store.upsert_entity("alpha", "Alpha").await.unwrap();
        store.link_chunk_entity("d-0", "alpha", "ABOUT").await.unwrap();

        let degrees = store.degrees(&["alpha".to_string()]).await.unwrap();
        assert_eq!(degrees["alpha"], 1);

        let hits = store
            .chunks_for_entities(&["alpha".to_string()], 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "d-0");
    }
}
