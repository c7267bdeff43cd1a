//! Graph store backed by Neo4j.
//!
//! Nodes: `Document {id, title}`, `Chunk {id, doc_id, ord, text, tokens}`,
//! `Entity {key, name}`. Edges: `(Document)-[:HAS_CHUNK]->(Chunk)` and
//! `(Chunk)-[:ABOUT]->(Entity)`. All upserts go through `MERGE`, so
//! concurrent ingests touching the same entity converge to one node.

use std::collections::HashMap;

use neo4rs::{query, Graph};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{ChunkMetadata, RetrievedChunk};

use super::sanitize_rel;

pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    /// Connect to the Neo4j server.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password).await?;
        Ok(Self { graph })
    }

    /// Create the uniqueness constraints and indexes ingest relies on.
    pub async fn ensure_constraints(&self) -> Result<()> {
        info!("bootstrapping Neo4j constraints");

        let statements = [
            "CREATE CONSTRAINT IF NOT EXISTS FOR (d:Document) REQUIRE d.id IS UNIQUE",
            "CREATE CONSTRAINT IF NOT EXISTS FOR (c:Chunk) REQUIRE c.id IS UNIQUE",
            "CREATE CONSTRAINT IF NOT EXISTS FOR (e:Entity) REQUIRE e.key IS UNIQUE",
            "CREATE INDEX IF NOT EXISTS FOR (e:Entity) ON (e.name)",
        ];

        for statement in statements {
            self.graph.run(query(statement)).await?;
        }
        Ok(())
    }

    pub async fn upsert_document(&self, doc_id: &str, title: Option<&str>) -> Result<()> {
        let q = query(
            "MERGE (d:Document {id: $doc_id})
             SET d.title = $title,
                 d.created_at = coalesce(d.created_at, timestamp())",
        )
        .param("doc_id", doc_id)
        .param("title", title.unwrap_or_default());

        self.graph.run(q).await?;
        debug!("upserted document {doc_id}");
        Ok(())
    }

    pub async fn upsert_chunk(
        &self,
        chunk_id: &str,
        doc_id: &str,
        ord: usize,
        text: &str,
        tokens: usize,
    ) -> Result<()> {
        let q = query(
            "MERGE (c:Chunk {id: $chunk_id})
             SET c.doc_id = $doc_id,
                 c.ord = $ord,
                 c.text = $text,
                 c.tokens = $tokens",
        )
        .param("chunk_id", chunk_id)
        .param("doc_id", doc_id)
        .param("ord", ord as i64)
        .param("text", text)
        .param("tokens", tokens as i64);

        self.graph.run(q).await?;
        Ok(())
    }

    pub async fn link_doc_chunk(&self, doc_id: &str, chunk_id: &str) -> Result<()> {
        let q = query(
            "MATCH (d:Document {id: $doc_id}), (c:Chunk {id: $chunk_id})
             MERGE (d)-[:HAS_CHUNK]->(c)",
        )
        .param("doc_id", doc_id)
        .param("chunk_id", chunk_id);

        self.graph.run(q).await?;
        Ok(())
    }

    /// Entity keys are case-folded before the merge.
    pub async fn upsert_entity(&self, key: &str, display_name: &str) -> Result<String> {
        let folded = key.trim().to_lowercase();
        let q = query(
            "MERGE (e:Entity {key: $key})
             SET e.name = $name",
        )
        .param("key", folded.as_str())
        .param("name", display_name);

        self.graph.run(q).await?;
        Ok(folded)
    }

    pub async fn link_chunk_entity(
        &self,
        chunk_id: &str,
        entity_key: &str,
        rel: &str,
    ) -> Result<()> {
        let rel_type = sanitize_rel(rel);
        // The label is interpolated; sanitize_rel restricts it to [A-Z_].
        let cypher = format!(
            "MATCH (c:Chunk {{id: $chunk_id}}), (e:Entity {{key: $key}})
             MERGE (c)-[:{rel_type}]->(e)"
        );
        let q = query(&cypher)
            .param("chunk_id", chunk_id)
            .param("key", entity_key.trim().to_lowercase());

        self.graph.run(q).await?;
        Ok(())
    }

    /// ABOUT-edge counts per requested key; keys without a node report 0.
    pub async fn degrees(&self, entity_keys: &[String]) -> Result<HashMap<String, usize>> {
        let mut degrees: HashMap<String, usize> =
            entity_keys.iter().map(|key| (key.clone(), 0)).collect();
        if entity_keys.is_empty() {
            return Ok(degrees);
        }

        let folded: Vec<String> = entity_keys
            .iter()
            .map(|key| key.trim().to_lowercase())
            .collect();

        let q = query(
            "MATCH (e:Entity) WHERE e.key IN $keys
             OPTIONAL MATCH (e)<-[r:ABOUT]-(:Chunk)
             RETURN e.key AS key, count(r) AS degree",
        )
        .param("keys", folded);

        let mut rows = self.graph.execute(q).await?;
        let mut by_key: HashMap<String, usize> = HashMap::new();
        while let Some(row) = rows.next().await? {
            let key: String = row.get("key").unwrap_or_default();
            let degree: i64 = row.get("degree").unwrap_or(0);
            by_key.insert(key, degree.max(0) as usize);
        }

        for (key, degree) in degrees.iter_mut() {
            if let Some(found) = by_key.get(&key.trim().to_lowercase()) {
                *degree = *found;
            }
        }
        Ok(degrees)
    }

    /// Chunks linked to any of the given entities, ranked by matched
    /// entity count and tie-broken by (doc_id, ord).
    pub async fn chunks_for_entities(
        &self,
        entity_keys: &[String],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if entity_keys.is_empty() {
            return Ok(Vec::new());
        }

        let folded: Vec<String> = entity_keys
            .iter()
            .map(|key| key.trim().to_lowercase())
            .collect();

        let q = query(
            "MATCH (e:Entity) WHERE e.key IN $keys
             MATCH (e)<-[:ABOUT]-(c:Chunk)<-[:HAS_CHUNK]-(d:Document)
             WITH c, d, count(DISTINCT e) AS matches
             ORDER BY matches DESC, d.id ASC, c.ord ASC
             LIMIT $limit
             RETURN c.id AS chunk_id, c.text AS text, c.ord AS ord,
                    d.id AS doc_id, d.title AS title, matches",
        )
        .param("keys", folded)
        .param("limit", limit as i64);

        let mut rows = self.graph.execute(q).await?;
        let mut hits = Vec::new();
        while let Some(row) = rows.next().await? {
            let matches: i64 = row.get("matches").unwrap_or(0);
            let title: String = row.get("title").unwrap_or_default();
            hits.push(RetrievedChunk {
                id: row.get("chunk_id").unwrap_or_default(),
                text: row.get("text").unwrap_or_default(),
                metadata: ChunkMetadata {
                    doc_id: row.get("doc_id").unwrap_or_default(),
                    ord: row.get::<i64>("ord").unwrap_or(0).max(0) as usize,
                    title: if title.is_empty() { None } else { Some(title) },
                },
                score: 1.0 / (1.0 + matches.max(0) as f32),
            });
        }
        Ok(hits)
    }

    /// True when the database answers a trivial read.
    pub async fn ping(&self) -> bool {
        self.graph.run(query("RETURN 1")).await.is_ok()
    }
}
