//! SQLite-based vector store implementation.
//!
//! Embeddings are stored as little-endian `f32` blobs and similarity is
//! computed in Rust over the requested collection.

use super::{rank_candidates, Chunk, IndexedSource, Match, VectorStore};
use crate::error::{AmplonError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        source_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(collection, source_id);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets searches read while an ingestion batch commits
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AmplonError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn insert_chunks(tx: &Transaction<'_>, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut stmt = tx.prepare_cached(
            r#"
            INSERT OR REPLACE INTO chunks
            (collection, id, source_id, position, text, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )?;

        for chunk in chunks {
            stmt.execute(params![
                collection,
                chunk.id,
                chunk.source_id,
                chunk.position,
                chunk.text,
                Self::embedding_to_bytes(&chunk.embedding),
                chunk.indexed_at.to_rfc3339(),
            ])?;
        }

        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_batch(&self, collection: &str, chunks: &[Chunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        Self::insert_chunks(&tx, collection, chunks)?;
        tx.commit()?;

        info!("Upserted {} chunks into {}", chunks.len(), collection);
        Ok(chunks.len())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn replace_source(&self, collection: &str, source_id: &str, chunks: &[Chunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let removed = tx.execute(
            "DELETE FROM chunks WHERE collection = ?1 AND source_id = ?2",
            params![collection, source_id],
        )?;
        Self::insert_chunks(&tx, collection, chunks)?;
        tx.commit()?;

        info!(
            "Replaced {} chunks of {} in {} with {}",
            removed,
            source_id,
            collection,
            chunks.len()
        );
        Ok(chunks.len())
    }

    #[instrument(skip(self, embedding))]
    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<Match>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, source_id, position, text, embedding, indexed_at
            FROM chunks
            WHERE collection = ?1
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map(params![collection], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let indexed_at: String = row.get(5)?;

            Ok(Chunk {
                id: row.get(0)?,
                source_id: row.get(1)?,
                position: row.get(2)?,
                text: row.get(3)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
                indexed_at: Self::parse_timestamp(&indexed_at),
            })
        })?;

        let candidates = rows.collect::<std::result::Result<Vec<Chunk>, _>>()?;
        let matches = rank_candidates(&candidates, embedding, k);

        debug!("Found {} matches in {}", matches.len(), collection);
        Ok(matches)
    }

    #[instrument(skip(self))]
    async fn delete_by_source(&self, collection: &str, source_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM chunks WHERE collection = ?1 AND source_id = ?2",
            params![collection, source_id],
        )?;

        debug!("Deleted {} chunks for {} in {}", deleted, source_id, collection);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_sources(&self, collection: &str) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT source_id, COUNT(*) AS chunk_count, MAX(indexed_at) AS indexed_at
            FROM chunks
            WHERE collection = ?1
            GROUP BY source_id
            ORDER BY indexed_at DESC, source_id
            "#,
        )?;

        let rows = stmt.query_map(params![collection], |row| {
            let indexed_at: String = row.get(2)?;
            Ok(IndexedSource {
                source_id: row.get(0)?,
                chunk_count: row.get(1)?,
                indexed_at: Self::parse_timestamp(&indexed_at),
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
