//! Ingestion coordinator.
//!
//! Pipeline: trim -> chunk -> embed -> vector upsert -> graph upsert ->
//! entity linking. The stores are not jointly transactional; vector
//! writes come first so hybrid retrieval never surfaces a chunk id that
//! has no vector representation. A graph failure after vector success
//! leaves a partial ingest behind, which is accepted.

use std::future::Future;
use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use crate::chunking::split_text;
use crate::config::Settings;
use crate::embed::EmbeddingBackend;
use crate::entities::extract_entities;
use crate::error::{Error, Result};
use crate::models::{ChunkMetadata, CrawledPage, IngestResult, VectorRecord};
use crate::store::{GraphBackend, VectorBackend};

/// Keys shorter than this never get ABOUT edges; single letters from
/// phrase suffixes would otherwise link to nearly every chunk.
pub const MIN_LINK_KEY_CHARS: usize = 3;

const DEFAULT_TITLE: &str = "Untitled";

pub struct IngestService<'a> {
    settings: &'a Settings,
    vector: &'a VectorBackend,
    graph: &'a GraphBackend,
    embedder: &'a EmbeddingBackend,
}

impl<'a> IngestService<'a> {
    pub fn new(
        settings: &'a Settings,
        vector: &'a VectorBackend,
        graph: &'a GraphBackend,
        embedder: &'a EmbeddingBackend,
    ) -> Self {
        Self {
            settings,
            vector,
            graph,
            embedder,
        }
    }

    /// Ingest plain text: chunk, embed, and write to both stores.
    pub async fn ingest_text(&self, title: Option<&str>, text: &str) -> Result<IngestResult> {
        let started = Instant::now();

        let text = text.trim();
        if text.is_empty() {
            return Ok(IngestResult::empty(elapsed_ms(started)));
        }

        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => DEFAULT_TITLE.to_string(),
        };

        let doc_id = Uuid::new_v4().simple().to_string();
        let chunks = split_text(text, self.settings.chunk_tokens, self.settings.chunk_overlap);
        if chunks.is_empty() {
            return Ok(IngestResult::empty(elapsed_ms(started)));
        }

        let chunk_texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&chunk_texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Provider(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorRecord {
                id: format!("{doc_id}-{}", chunk.ord),
                text: chunk.text.clone(),
                metadata: ChunkMetadata {
                    doc_id: doc_id.clone(),
                    ord: chunk.ord,
                    title: Some(title.clone()),
                },
                embedding,
            })
            .collect();

        // Vector upsert must precede graph upsert for every chunk.
        self.vector.upsert(&records)?;

        self.graph.upsert_document(&doc_id, Some(&title)).await?;
        for (chunk, record) in chunks.iter().zip(&records) {
            self.graph
                .upsert_chunk(&record.id, &doc_id, chunk.ord, &chunk.text, chunk.tokens)
                .await?;
            self.graph.link_doc_chunk(&doc_id, &record.id).await?;
        }

        let text_refs: Vec<&str> = chunk_texts.iter().map(String::as_str).collect();
        let entities = extract_entities(&text_refs);
        let lowered: Vec<String> = chunk_texts.iter().map(|t| t.to_lowercase()).collect();
        for entity in &entities {
            self.graph.upsert_entity(entity, entity).await?;
            if entity.len() < MIN_LINK_KEY_CHARS {
                continue;
            }
            for (record, lowered_text) in records.iter().zip(&lowered) {
                if lowered_text.contains(entity.as_str()) {
                    self.graph
                        .link_chunk_entity(&record.id, entity, "ABOUT")
                        .await?;
                }
            }
        }

        let result = IngestResult {
            chunks: chunks.len(),
            entities: entities.len(),
            vector_count: records.len(),
            ms: elapsed_ms(started),
            pages: None,
        };
        info!(
            doc_id,
            chunks = result.chunks,
            entities = result.entities,
            ms = result.ms,
            "ingested document"
        );
        Ok(result)
    }

    /// Ingest a PDF via the external byte-to-text collaborator. The page
    /// count is inferred from form feeds in the extracted text.
    pub async fn ingest_pdf<E>(
        &self,
        title: Option<&str>,
        data: &[u8],
        extract: E,
    ) -> Result<IngestResult>
    where
        E: FnOnce(&[u8]) -> Result<String>,
    {
        let started = Instant::now();

        let text =
            extract(data).map_err(|e| Error::BadInput(format!("failed to process PDF: {e}")))?;
        let pages = if text.is_empty() {
            0
        } else {
            text.matches('\u{c}').count() + 1
        };

        let mut result = self.ingest_text(title, &text).await?;
        result.pages = Some(pages);
        result.ms = elapsed_ms(started);
        Ok(result)
    }

    /// Crawl a URL via the external crawler collaborator and ingest each
    /// page as its own document titled by its URL.
    pub async fn ingest_url<F, Fut>(
        &self,
        url: &str,
        max_depth: Option<usize>,
        max_pages: Option<usize>,
        crawl: F,
    ) -> Result<IngestResult>
    where
        F: FnOnce(String, usize, usize) -> Fut,
        Fut: Future<Output = Result<Vec<CrawledPage>>>,
    {
        let started = Instant::now();

        let url = url.trim();
        if url.is_empty() {
            return Err(Error::BadInput("url must not be empty".to_string()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::BadInput(
                "url must start with http:// or https://".to_string(),
            ));
        }

        let depth = max_depth.unwrap_or(self.settings.url_max_depth);
        let pages_limit = max_pages.unwrap_or(self.settings.url_max_pages).max(1);

        let pages = crawl(url.to_string(), depth, pages_limit).await?;
        debug!(url, pages = pages.len(), "crawl finished");

        let mut total = IngestResult::empty(0);
        for page in &pages {
            let page_result = self.ingest_text(Some(&page.url), &page.text).await?;
            total.chunks += page_result.chunks;
            total.entities += page_result.entities;
            total.vector_count += page_result.vector_count;
        }

        total.pages = Some(pages.len());
        total.ms = elapsed_ms(started);
        Ok(total)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
