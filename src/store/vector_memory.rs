//! In-memory vector store fallback.
//!
//! Linear cosine scan over an insertion-ordered map. Satisfies the full
//! store contract; only persistence and scalability differ from the
//! SQLite-backed variant.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::models::{RetrievedChunk, VectorRecord};

use super::cosine_distance;

#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    order: Vec<String>,
    records: HashMap<String, VectorRecord>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent upsert by chunk id; an existing record keeps its
    /// insertion position so empty-query results stay deterministic.
    pub fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut inner = self.inner.lock().expect("vector store lock poisoned");
        for record in records {
            if !inner.records.contains_key(&record.id) {
                inner.order.push(record.id.clone());
            }
            inner.records.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let inner = self.inner.lock().expect("vector store lock poisoned");
        let k = k.max(1);

        if query.is_empty() {
            return Ok(inner
                .order
                .iter()
                .take(k)
                .filter_map(|id| inner.records.get(id))
                .map(|record| to_hit(record, 0.0))
                .collect());
        }

        let mut hits: Vec<RetrievedChunk> = inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .map(|record| to_hit(record, cosine_distance(query, &record.embedding)))
            .collect();

        hits.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    pub fn ping(&self) -> bool {
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("vector store lock poisoned").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().expect("vector store lock poisoned");
        inner.order.clear();
        inner.records.clear();
        Ok(())
    }
}

fn to_hit(record: &VectorRecord, score: f32) -> RetrievedChunk {
    RetrievedChunk {
        id: record.id.clone(),
        text: record.text.clone(),
        metadata: record.metadata.clone(),
        score,
    }
}
