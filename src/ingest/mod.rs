//! Ingestion of video transcripts and PDF documents.
//!
//! Every source is turned into `(position, text)` pairs, embedded in one
//! batch and written to its collection under deterministic chunk IDs, so
//! re-running an ingestion replaces the previous chunks of that source.

pub mod pdf;
pub mod transcript;

pub use pdf::{PdfExtractText, PdfExtractor};
pub use transcript::{TranscriptSegment, TranscriptSource, YtDlpTranscriptSource};

use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{AmplonError, Result};
use crate::vector_store::{Chunk, VectorStore};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// Longest text sent to the embedding API for one chunk, in bytes.
/// Keeps dense pages under the model's input limit.
const MAX_CHUNK_BYTES: usize = 24_000;

/// Kind of ingested source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Video,
    Document,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Video => write!(f, "video"),
            SourceKind::Document => write!(f, "document"),
        }
    }
}

/// Outcome of one successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub kind: SourceKind,
    /// Video ID or PDF filename.
    pub source_id: String,
    /// Chunks written (caption seconds or non-blank pages).
    pub chunks: usize,
}

/// Result of one source in a batch ingestion.
#[derive(Debug)]
pub struct IngestOutcome {
    pub source: String,
    pub result: Result<IngestReport>,
}

/// Ingests sources into the vector store.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    transcripts: Arc<dyn TranscriptSource>,
    pdfs: Arc<dyn PdfExtractor>,
    http: reqwest::Client,
    video_collection: String,
    document_collection: String,
    upload_dir: PathBuf,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        transcripts: Arc<dyn TranscriptSource>,
        pdfs: Arc<dyn PdfExtractor>,
        settings: &Settings,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            embedder,
            store,
            transcripts,
            pdfs,
            http,
            video_collection: settings.vector_store.video_collection.clone(),
            document_collection: settings.vector_store.document_collection.clone(),
            upload_dir: settings.upload_dir(),
            max_attempts: settings.ingest.max_attempts,
            retry_backoff: Duration::from_millis(settings.ingest.retry_backoff_ms),
        })
    }

    /// Directory ingested PDFs are copied into.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Ingest the captions of one video, given its ID or URL.
    #[instrument(skip(self))]
    pub async fn ingest_video(&self, input: &str) -> Result<IngestReport> {
        let video_id = transcript::parse_video_id(input).ok_or_else(|| {
            AmplonError::InvalidInput(format!("Not a YouTube video ID or URL: {}", input))
        })?;

        let segments = self.transcripts.fetch(&video_id).await?;
        let items = transcript::group_by_second(&segments);
        if items.is_empty() {
            return Err(AmplonError::Transcript(format!(
                "Transcript for {} has no text",
                video_id
            )));
        }

        let chunks = self.index(&self.video_collection, &video_id, items).await?;
        info!("Ingested video {} ({} chunks)", video_id, chunks);

        Ok(IngestReport {
            kind: SourceKind::Video,
            source_id: video_id,
            chunks,
        })
    }

    /// Ingest an uploaded PDF and keep a copy in the upload directory.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn ingest_pdf_bytes(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestReport> {
        let filename = pdf::sanitize_filename(filename)?;
        if !pdf::is_pdf(&bytes) {
            return Err(AmplonError::InvalidInput(format!("{} is not a PDF file", filename)));
        }

        let pages = self.pdfs.extract_pages(bytes.clone()).await?;
        let items = pdf::number_pages(pages);
        if items.is_empty() {
            return Err(AmplonError::Pdf(format!("{} has no extractable text", filename)));
        }

        // Staged copy is renamed into place only once the pages are indexed
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let target = self.upload_dir.join(&filename);
        let staged = self.upload_dir.join(format!(".{}.part", filename));
        tokio::fs::write(&staged, &bytes).await?;

        let chunks = match self.index(&self.document_collection, &filename, items).await {
            Ok(chunks) => chunks,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staged).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&staged, &target).await {
            let _ = tokio::fs::remove_file(&staged).await;
            self.store
                .delete_by_source(&self.document_collection, &filename)
                .await?;
            return Err(e.into());
        }

        info!("Ingested document {} ({} pages)", filename, chunks);

        Ok(IngestReport {
            kind: SourceKind::Document,
            source_id: filename,
            chunks,
        })
    }

    /// Ingest a PDF from disk.
    pub async fn ingest_pdf_path(&self, path: &Path) -> Result<IngestReport> {
        let filename = pdf::filename_from_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        self.ingest_pdf_bytes(&filename, bytes).await
    }

    /// Download and ingest a PDF.
    #[instrument(skip(self))]
    pub async fn ingest_pdf_url(&self, url: &str) -> Result<IngestReport> {
        let parsed = Url::parse(url)
            .map_err(|e| AmplonError::InvalidInput(format!("Invalid URL {}: {}", url, e)))?;
        let filename = pdf::filename_from_url(&parsed)?;

        info!("Downloading {}", parsed);
        let response = self.http.get(parsed).send().await?.error_for_status()?;
        let bytes = response.bytes().await?.to_vec();

        self.ingest_pdf_bytes(&filename, bytes).await
    }

    /// Ingest a PDF given either an http(s) URL or a local path.
    pub async fn ingest_pdf(&self, input: &str) -> Result<IngestReport> {
        if input.starts_with("http://") || input.starts_with("https://") {
            self.ingest_pdf_url(input).await
        } else {
            self.ingest_pdf_path(&Settings::expand_path(input)).await
        }
    }

    /// Ingest a list of videos and PDFs, retrying each one independently.
    /// A failing source does not stop the others. `on_outcome` is called as
    /// each source finishes.
    pub async fn ingest_all<F>(
        &self,
        video_ids: &[String],
        pdf_sources: &[String],
        mut on_outcome: F,
    ) -> Vec<IngestOutcome>
    where
        F: FnMut(&IngestOutcome),
    {
        let mut outcomes = Vec::with_capacity(video_ids.len() + pdf_sources.len());

        for video in video_ids {
            let result = self.with_retry(video, || self.ingest_video(video)).await;
            let outcome = IngestOutcome {
                source: video.clone(),
                result,
            };
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        for source in pdf_sources {
            let result = self.with_retry(source, || self.ingest_pdf(source)).await;
            let outcome = IngestOutcome {
                source: source.clone(),
                result,
            };
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Run `op` up to `max_attempts` times with linear backoff.
    /// Invalid input, missing tools and unreadable PDFs fail immediately.
    pub async fn with_retry<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && is_retryable(&e) => {
                    warn!("Ingesting {} failed (attempt {}/{}): {}", label, attempt, attempts, e);
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Embed `items` and replace the source's chunks in `collection`.
    async fn index(
        &self,
        collection: &str,
        source_id: &str,
        items: Vec<(i64, String)>,
    ) -> Result<usize> {
        let texts: Vec<String> = items
            .iter()
            .map(|(_, text)| truncate_at_char_boundary(text, MAX_CHUNK_BYTES).to_string())
            .collect();

        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != items.len() {
            return Err(AmplonError::Embedding(format!(
                "Expected {} embeddings, got {}",
                items.len(),
                embeddings.len()
            )));
        }

        let dimensions = self.embedder.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(AmplonError::Embedding(format!(
                "Expected {}-dimensional embeddings, got {}",
                dimensions,
                bad.len()
            )));
        }

        let chunks: Vec<Chunk> = items
            .into_iter()
            .zip(embeddings)
            .map(|((position, text), embedding)| Chunk::new(source_id, position, text, embedding))
            .collect();

        self.store.replace_source(collection, source_id, &chunks).await
    }
}

fn is_retryable(error: &AmplonError) -> bool {
    !matches!(
        error,
        AmplonError::InvalidInput(_)
            | AmplonError::ToolNotFound(_)
            | AmplonError::Config(_)
            | AmplonError::Pdf(_)
    )
}

fn truncate_at_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
