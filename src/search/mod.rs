//! Semantic search over the video and document collections.
//!
//! A query is embedded, matched against one collection, passed through
//! proximity deduplication and annotated with deep links.

pub mod links;

pub use links::LinkBuilder;

use crate::config::Settings;
use crate::dedup::dedup_by_proximity;
use crate::embedding::Embedder;
use crate::error::{AmplonError, Result};
use crate::vector_store::{Match, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// A transcript hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResult {
    pub video_id: String,
    /// Whole seconds into the video.
    pub start: i64,
    pub text: String,
    pub link: String,
}

/// A PDF page hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub filename: String,
    pub page: i64,
    pub link: String,
}

/// Runs searches against the configured collections.
pub struct SearchService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    links: LinkBuilder,
    video_collection: String,
    document_collection: String,
    video_threshold: u32,
    document_threshold: u32,
    max_top_k: usize,
}

impl SearchService {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, settings: &Settings) -> Self {
        Self {
            embedder,
            store,
            links: LinkBuilder::from_settings(&settings.links),
            video_collection: settings.vector_store.video_collection.clone(),
            document_collection: settings.vector_store.document_collection.clone(),
            video_threshold: settings.search.proximity_threshold,
            document_threshold: settings.search.document_proximity_threshold,
            max_top_k: settings.search.max_top_k,
        }
    }

    /// Search transcripts; hits within the proximity threshold of a
    /// better hit from the same video are dropped.
    #[instrument(skip(self))]
    pub async fn search_videos(&self, query: &str, top_k: usize) -> Result<Vec<VideoResult>> {
        let matches = self.ranked(&self.video_collection, query, top_k).await?;
        let kept = dedup_by_proximity(matches, self.video_threshold);
        log_kept(&kept);

        Ok(kept
            .into_iter()
            .map(|m| VideoResult {
                link: self.links.video(&m.source_id, m.position),
                video_id: m.source_id,
                start: m.position,
                text: m.text,
            })
            .collect())
    }

    /// Search PDF pages, deduplicated with the document threshold.
    #[instrument(skip(self))]
    pub async fn search_documents(&self, query: &str, top_k: usize) -> Result<Vec<DocumentResult>> {
        let matches = self.ranked(&self.document_collection, query, top_k).await?;
        let kept = dedup_by_proximity(matches, self.document_threshold);
        log_kept(&kept);

        Ok(kept
            .into_iter()
            .map(|m| DocumentResult {
                link: self.links.document(&m.source_id, m.position),
                filename: m.source_id,
                page: m.position,
            })
            .collect())
    }

    async fn ranked(&self, collection: &str, query: &str, top_k: usize) -> Result<Vec<Match>> {
        self.validate(query, top_k)?;

        let embedding = self.embedder.embed(query.trim()).await?;
        let matches = self.store.query(collection, &embedding, top_k).await?;

        debug!("{} raw matches from {}", matches.len(), collection);
        Ok(matches)
    }

    fn validate(&self, query: &str, top_k: usize) -> Result<()> {
        if query.trim().is_empty() {
            return Err(AmplonError::InvalidInput("query must not be empty".to_string()));
        }
        if top_k == 0 || top_k > self.max_top_k {
            return Err(AmplonError::InvalidInput(format!(
                "top_k must be between 1 and {}",
                self.max_top_k
            )));
        }
        Ok(())
    }
}

fn log_kept(kept: &[Match]) {
    for m in kept {
        debug!(
            rank = m.rank,
            score = m.score,
            "Kept {} @ {}",
            m.source_id,
            m.position
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{Chunk, MemoryVectorStore};
    use async_trait::async_trait;

    /// Maps every query to the same vector.
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }

        fn dimensions(&self) -> usize {
            self.0.len()
        }
    }

    fn chunk(source: &str, position: i64, weight: f32) -> Chunk {
        Chunk::new(source, position, format!("{}@{}", source, position), vec![1.0, weight])
    }

    async fn service_with(chunks: Vec<Chunk>, collection: &str) -> SearchService {
        let store = Arc::new(MemoryVectorStore::new());
        store.upsert_batch(collection, &chunks).await.unwrap();
        SearchService::new(
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            store,
            &Settings::default(),
        )
    }

    #[tokio::test]
    async fn test_video_search_dedups_and_links() {
        let service = service_with(
            vec![
                chunk("vidA", 10, 0.0),
                chunk("vidA", 15, 0.1),
                chunk("vidA", 50, 0.2),
                chunk("vidB", 10, 0.3),
            ],
            "youtube_chunks",
        )
        .await;

        let results = service.search_videos("how to", 4).await.unwrap();
        let located: Vec<(&str, i64)> = results.iter().map(|r| (r.video_id.as_str(), r.start)).collect();
        assert_eq!(located, vec![("vidA", 10), ("vidA", 50), ("vidB", 10)]);
        assert_eq!(results[0].link, "https://www.youtube.com/watch?v=vidA&t=10s");
        assert_eq!(results[0].text, "vidA@10");
    }

    #[tokio::test]
    async fn test_document_search_keeps_distinct_pages() {
        let service = service_with(
            vec![chunk("guide.pdf", 1, 0.0), chunk("guide.pdf", 2, 0.1)],
            "pdf_chunks",
        )
        .await;

        let results = service.search_documents("water", 3).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].page, 1);
        assert_eq!(results[1].link, "http://localhost:8000/pdfs/guide.pdf#page=2");
    }

    #[tokio::test]
    async fn test_rejects_bad_parameters() {
        let service = service_with(Vec::new(), "youtube_chunks").await;

        assert!(matches!(
            service.search_videos("   ", 3).await,
            Err(AmplonError::InvalidInput(_))
        ));
        assert!(matches!(
            service.search_videos("q", 0).await,
            Err(AmplonError::InvalidInput(_))
        ));
        assert!(matches!(
            service.search_documents("q", 51).await,
            Err(AmplonError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_collection_returns_nothing() {
        let service = service_with(Vec::new(), "youtube_chunks").await;
        assert!(service.search_videos("anything", 3).await.unwrap().is_empty());
    }
}
