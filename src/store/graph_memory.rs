//! In-memory graph store fallback.
//!
//! Adjacency maps behind one coarse mutex; merge semantics match the
//! Neo4j variant, so concurrent ingests touching the same entity converge
//! to a single node.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::Result;
use crate::models::{ChunkMetadata, RetrievedChunk};

use super::sanitize_rel;

#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<String, DocumentRow>,
    chunks: HashMap<String, ChunkRow>,
    doc_chunks: HashMap<String, HashSet<String>>,
    entities: HashMap<String, EntityRow>,
}

#[derive(Debug)]
struct DocumentRow {
    title: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug)]
struct ChunkRow {
    doc_id: String,
    ord: usize,
    text: String,
    #[allow(dead_code)]
    tokens: usize,
}

#[derive(Debug, Default)]
struct EntityRow {
    name: String,
    chunks: HashSet<String>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_constraints(&self) -> Result<()> {
        // Uniqueness is structural for the in-memory maps.
        Ok(())
    }

    pub fn upsert_document(&self, doc_id: &str, title: Option<&str>) -> Result<()> {
        let mut inner = self.inner.lock().expect("graph store lock poisoned");
        let row = inner
            .documents
            .entry(doc_id.to_string())
            .or_insert_with(|| DocumentRow {
                title: None,
                created_at: chrono::Utc::now(),
            });
        row.title = title.map(|t| t.to_string());
        Ok(())
    }

    pub fn upsert_chunk(
        &self,
        chunk_id: &str,
        doc_id: &str,
        ord: usize,
        text: &str,
        tokens: usize,
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("graph store lock poisoned");
        inner.chunks.insert(
            chunk_id.to_string(),
            ChunkRow {
                doc_id: doc_id.to_string(),
                ord,
                text: text.to_string(),
                tokens,
            },
        );
        Ok(())
    }

    pub fn link_doc_chunk(&self, doc_id: &str, chunk_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("graph store lock poisoned");
        inner
            .doc_chunks
            .entry(doc_id.to_string())
            .or_default()
            .insert(chunk_id.to_string());
        Ok(())
    }

    /// Entity keys are case-folded on write.
    pub fn upsert_entity(&self, key: &str, display_name: &str) -> Result<String> {
        let key = key.trim().to_lowercase();
        let mut inner = self.inner.lock().expect("graph store lock poisoned");
        let row = inner.entities.entry(key.clone()).or_default();
        row.name = display_name.to_string();
        Ok(key)
    }

    pub fn link_chunk_entity(&self, chunk_id: &str, entity_key: &str, rel: &str) -> Result<()> {
        // Only ABOUT edges exist today; sanitize keeps the contract honest.
        let _rel = sanitize_rel(rel);
        let key = entity_key.trim().to_lowercase();
        let mut inner = self.inner.lock().expect("graph store lock poisoned");
        inner
            .entities
            .entry(key)
            .or_default()
            .chunks
            .insert(chunk_id.to_string());
        Ok(())
    }

    /// ABOUT-edge counts per entity key; missing keys report 0.
    pub fn degrees(&self, entity_keys: &[String]) -> Result<HashMap<String, usize>> {
        let inner = self.inner.lock().expect("graph store lock poisoned");
        Ok(entity_keys
            .iter()
            .map(|key| {
                let folded = key.trim().to_lowercase();
                let degree = inner
                    .entities
                    .get(&folded)
                    .map(|row| row.chunks.len())
                    .unwrap_or(0);
                (key.clone(), degree)
            })
            .collect())
    }

    /// Chunks linked to any of the entities, each at most once, scored by
    /// 1 / (1 + matched entity count) and tie-broken by (doc_id, ord).
    pub fn chunks_for_entities(
        &self,
        entity_keys: &[String],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let inner = self.inner.lock().expect("graph store lock poisoned");

        let mut match_counts: HashMap<&str, usize> = HashMap::new();
        for key in entity_keys {
            let folded = key.trim().to_lowercase();
            if let Some(row) = inner.entities.get(&folded) {
                for chunk_id in &row.chunks {
                    *match_counts.entry(chunk_id.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut hits: Vec<RetrievedChunk> = match_counts
            .into_iter()
            .filter_map(|(chunk_id, matches)| {
                let chunk = inner.chunks.get(chunk_id)?;
                let title = inner
                    .documents
                    .get(&chunk.doc_id)
                    .and_then(|doc| doc.title.clone());
                Some(RetrievedChunk {
                    id: chunk_id.to_string(),
                    text: chunk.text.clone(),
                    metadata: ChunkMetadata {
                        doc_id: chunk.doc_id.clone(),
                        ord: chunk.ord,
                        title,
                    },
                    score: 1.0 / (1.0 + matches as f32),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.metadata.doc_id.cmp(&b.metadata.doc_id))
                .then_with(|| a.metadata.ord.cmp(&b.metadata.ord))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    pub fn ping(&self) -> bool {
        true
    }

    pub fn chunk_count(&self) -> usize {
        self.inner.lock().expect("graph store lock poisoned").chunks.len()
    }

    pub fn document_created_at(&self, doc_id: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.inner
            .lock()
            .expect("graph store lock poisoned")
            .documents
            .get(doc_id)
            .map(|row| row.created_at)
    }
}
