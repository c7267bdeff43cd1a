//! Persistent vector store backed by a SQLite file under `VECTOR_DIR`.
//!
//! Embeddings are stored as little-endian f32 blobs; search is a linear
//! cosine scan, which is plenty for service-desk-sized corpora. All
//! statements run behind a single connection mutex.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::Result;
use crate::models::{ChunkMetadata, RetrievedChunk, VectorRecord};

use super::cosine_distance;

const DB_FILE: &str = "vectors.db";

#[derive(Debug)]
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteVectorStore {
    /// Open (or create) the store inside the given directory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(DB_FILE);
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id        TEXT PRIMARY KEY,
                doc_id    TEXT NOT NULL,
                ord       INTEGER NOT NULL,
                title     TEXT,
                text      TEXT NOT NULL,
                embedding BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_doc ON chunks(doc_id);",
        )?;
        debug!(path = %path.display(), "opened sqlite vector store");

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().expect("vector store lock poisoned");
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (id, doc_id, ord, title, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     doc_id = excluded.doc_id,
                     ord = excluded.ord,
                     title = excluded.title,
                     text = excluded.text,
                     embedding = excluded.embedding",
            )?;
            for record in records {
                stmt.execute(params![
                    record.id,
                    record.metadata.doc_id,
                    record.metadata.ord as i64,
                    record.metadata.title,
                    record.text,
                    encode_embedding(&record.embedding),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let conn = self.conn.lock().expect("vector store lock poisoned");
        let k = k.max(1);

        let mut stmt = conn.prepare(
            "SELECT id, doc_id, ord, title, text, embedding FROM chunks ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Vec<u8>>(5)?,
            ))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (id, doc_id, ord, title, text, blob) = row?;
            let score = if query.is_empty() {
                0.0
            } else {
                cosine_distance(query, &decode_embedding(&blob))
            };
            hits.push(RetrievedChunk {
                id,
                text,
                metadata: ChunkMetadata {
                    doc_id,
                    ord: ord.max(0) as usize,
                    title,
                },
                score,
            });
        }

        if !query.is_empty() {
            hits.sort_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        hits.truncate(k);
        Ok(hits)
    }

    pub fn ping(&self) -> bool {
        let conn = self.conn.lock().expect("vector store lock poisoned");
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("vector store lock poisoned");
        let count: i64 = conn.query_row("SELECT count(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().expect("vector store lock poisoned");
        conn.execute("DELETE FROM chunks", [])?;
        Ok(())
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
