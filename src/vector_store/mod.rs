//! Vector store abstraction for Amplon.
//!
//! Chunks live in named collections (one for transcripts, one for PDF pages)
//! and are retrieved by cosine similarity to a query embedding.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::{Settings, VectorStoreProvider};
use crate::dedup::Located;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A unit of ingested text with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique ID, derived from `source_id` and `position`.
    pub id: String,
    /// Video ID or PDF filename.
    pub source_id: String,
    /// Whole seconds into the video, or 1-based PDF page number.
    pub position: i64,
    /// Text content.
    pub text: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk; the ID is derived from source and position.
    pub fn new(source_id: &str, position: i64, text: String, embedding: Vec<f32>) -> Self {
        Self {
            id: Self::make_id(source_id, position),
            source_id: source_id.to_string(),
            position,
            text,
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// Build the deterministic chunk ID for a source position.
    pub fn make_id(source_id: &str, position: i64) -> String {
        format!("{}_{}", source_id, position)
    }
}

/// A nearest-neighbor hit, ranked best first.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: String,
    pub source_id: String,
    pub position: i64,
    pub text: String,
    /// Cosine similarity (higher is better).
    pub score: f32,
    /// 0-based position in the store's ranking.
    pub rank: usize,
}

impl Located for Match {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn position(&self) -> i64 {
        self.position
    }
}

/// Summary of one indexed source within a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    pub source_id: String,
    pub chunk_count: u32,
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks, replacing any existing chunk with the same ID.
    async fn upsert_batch(&self, collection: &str, chunks: &[Chunk]) -> Result<usize>;

    /// Return the `k` chunks most similar to `embedding`, best first.
    /// Equal scores keep the store's insertion order.
    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<Match>>;

    /// Delete every chunk of a source.
    async fn delete_by_source(&self, collection: &str, source_id: &str) -> Result<usize>;

    /// Swap all chunks of `source_id` for `chunks` in one step. On error the
    /// previous chunks are left in place, and readers never observe the
    /// source half-replaced.
    async fn replace_source(&self, collection: &str, source_id: &str, chunks: &[Chunk]) -> Result<usize>;

    /// List indexed sources in a collection, most recently indexed first.
    async fn list_sources(&self, collection: &str) -> Result<Vec<IndexedSource>>;

    /// Number of chunks in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Open the vector store selected in settings.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider {
        VectorStoreProvider::Sqlite => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        VectorStoreProvider::Memory => Ok(Arc::new(MemoryVectorStore::new())),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score, rank and truncate candidate chunks.
///
/// `sort_by` is stable, so equal scores keep candidate order.
pub(crate) fn rank_candidates<'a, I>(candidates: I, embedding: &[f32], k: usize) -> Vec<Match>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    let mut scored: Vec<(f32, &Chunk)> = candidates
        .into_iter()
        .map(|chunk| (cosine_similarity(embedding, &chunk.embedding), chunk))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .enumerate()
        .map(|(rank, (score, chunk))| Match {
            id: chunk.id.clone(),
            source_id: chunk.source_id.clone(),
            position: chunk.position,
            text: chunk.text.clone(),
            score,
            rank,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_chunk_id_is_derived() {
        let chunk = Chunk::new("NLg7Wa6HmYI", 42, "hello".to_string(), vec![]);
        assert_eq!(chunk.id, "NLg7Wa6HmYI_42");
        assert_eq!(Chunk::make_id("manual.pdf", 3), "manual.pdf_3");
    }

    #[test]
    fn test_rank_candidates_keeps_tie_order() {
        let chunks = vec![
            Chunk::new("a", 1, "first".to_string(), vec![1.0, 0.0]),
            Chunk::new("a", 2, "second".to_string(), vec![1.0, 0.0]),
            Chunk::new("a", 3, "best".to_string(), vec![0.0, 1.0]),
        ];

        let ranked = rank_candidates(&chunks, &[0.1, 1.0], 3);
        assert_eq!(ranked[0].text, "best");

        let ranked = rank_candidates(&chunks, &[1.0, 0.0], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].text, "first");
        assert_eq!(ranked[1].text, "second");
        assert_eq!(ranked[1].rank, 1);
    }
}
