//! In-memory vector store implementation.
//!
//! Useful for testing and throwaway runs.

use super::{rank_candidates, Chunk, IndexedSource, Match, VectorStore};
use crate::error::{AmplonError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store. Each collection keeps chunks in insertion order.
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<Chunk>>>> {
        self.collections
            .read()
            .map_err(|e| AmplonError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<Chunk>>>> {
        self.collections
            .write()
            .map_err(|e| AmplonError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_batch(&self, collection: &str, chunks: &[Chunk]) -> Result<usize> {
        let mut collections = self.write()?;
        let stored = collections.entry(collection.to_string()).or_default();

        for chunk in chunks {
            match stored.iter_mut().find(|c| c.id == chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => stored.push(chunk.clone()),
            }
        }

        Ok(chunks.len())
    }

    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<Match>> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map(|chunks| rank_candidates(chunks, embedding, k))
            .unwrap_or_default())
    }

    async fn delete_by_source(&self, collection: &str, source_id: &str) -> Result<usize> {
        let mut collections = self.write()?;
        let Some(chunks) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let initial_len = chunks.len();
        chunks.retain(|c| c.source_id != source_id);
        Ok(initial_len - chunks.len())
    }

    async fn replace_source(&self, collection: &str, source_id: &str, chunks: &[Chunk]) -> Result<usize> {
        let mut collections = self.write()?;
        let stored = collections.entry(collection.to_string()).or_default();

        stored.retain(|c| c.source_id != source_id);
        stored.extend(chunks.iter().cloned());

        Ok(chunks.len())
    }

    async fn list_sources(&self, collection: &str) -> Result<Vec<IndexedSource>> {
        let collections = self.read()?;
        let Some(chunks) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut sources: HashMap<&str, IndexedSource> = HashMap::new();
        for chunk in chunks {
            let entry = sources
                .entry(chunk.source_id.as_str())
                .or_insert_with(|| IndexedSource {
                    source_id: chunk.source_id.clone(),
                    chunk_count: 0,
                    indexed_at: chunk.indexed_at,
                });

            entry.chunk_count += 1;
            if chunk.indexed_at > entry.indexed_at {
                entry.indexed_at = chunk.indexed_at;
            }
        }

        let mut sources: Vec<IndexedSource> = sources.into_values().collect();
        sources.sort_by(|a, b| {
            b.indexed_at
                .cmp(&a.indexed_at)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });

        Ok(sources)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.read()?;
        Ok(collections.get(collection).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let chunks = vec![
            Chunk::new("video1", 0, "Hello world".to_string(), vec![1.0, 0.0, 0.0]),
            Chunk::new("video1", 30, "Goodbye world".to_string(), vec![0.0, 1.0, 0.0]),
        ];
        store.upsert_batch("videos", &chunks).await.unwrap();

        assert_eq!(store.count("videos").await.unwrap(), 2);
        assert_eq!(store.count("pdfs").await.unwrap(), 0);

        let results = store.query("videos", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].id, "video1_0");

        let sources = store.list_sources("videos").await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunk_count, 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = MemoryVectorStore::new();

        store
            .upsert_batch("videos", &[Chunk::new("v", 5, "old".to_string(), vec![1.0])])
            .await
            .unwrap();
        store
            .upsert_batch("videos", &[Chunk::new("v", 5, "new".to_string(), vec![1.0])])
            .await
            .unwrap();

        assert_eq!(store.count("videos").await.unwrap(), 1);
        let results = store.query("videos", &[1.0], 5).await.unwrap();
        assert_eq!(results[0].text, "new");
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch("videos", &[Chunk::new("shared", 1, "a".to_string(), vec![1.0])])
            .await
            .unwrap();
        store
            .upsert_batch("pdfs", &[Chunk::new("shared", 1, "b".to_string(), vec![1.0])])
            .await
            .unwrap();

        assert_eq!(store.delete_by_source("videos", "shared").await.unwrap(), 1);
        assert_eq!(store.count("videos").await.unwrap(), 0);
        assert_eq!(store.list_sources("pdfs").await.unwrap()[0].source_id, "shared");
    }

    #[tokio::test]
    async fn test_replace_source_swaps_only_that_source() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(
                "videos",
                &[
                    Chunk::new("a", 1, "a1".to_string(), vec![1.0]),
                    Chunk::new("b", 1, "b1".to_string(), vec![1.0]),
                    Chunk::new("a", 20, "a20".to_string(), vec![1.0]),
                ],
            )
            .await
            .unwrap();

        store
            .replace_source("videos", "a", &[Chunk::new("a", 5, "a5".to_string(), vec![1.0])])
            .await
            .unwrap();

        let results = store.query("videos", &[1.0], 10).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["b1", "a5"]);
    }
}
