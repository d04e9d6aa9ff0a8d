//! Explicitly constructed service components.
//!
//! Commands and HTTP handlers receive an `AppContext` instead of reaching
//! for global clients.

use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::ingest::{Ingestor, PdfExtractText, PdfExtractor, TranscriptSource, YtDlpTranscriptSource};
use crate::search::SearchService;
use crate::vector_store::{open_store, VectorStore};
use std::sync::Arc;
use tracing::info;

/// Shared handles to the embedder, vector store, search and ingestion.
#[derive(Clone)]
pub struct AppContext {
    settings: Arc<Settings>,
    store: Arc<dyn VectorStore>,
    search: Arc<SearchService>,
    ingestor: Arc<Ingestor>,
}

impl AppContext {
    /// Build production components from settings.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let store = open_store(&settings)?;
        let transcripts: Arc<dyn TranscriptSource> = Arc::new(YtDlpTranscriptSource::new(
            &settings.ingest.subtitle_language,
            settings.temp_dir(),
        ));
        let pdfs: Arc<dyn PdfExtractor> = Arc::new(PdfExtractText);

        info!(
            "Using {} vector store with {} embeddings",
            settings.vector_store.provider, settings.embedding.model
        );

        Self::with_components(settings, embedder, store, transcripts, pdfs)
    }

    /// Build a context from caller-supplied components.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        transcripts: Arc<dyn TranscriptSource>,
        pdfs: Arc<dyn PdfExtractor>,
    ) -> Result<Self> {
        let search = Arc::new(SearchService::new(embedder.clone(), store.clone(), &settings));
        let ingestor = Arc::new(Ingestor::new(embedder, store.clone(), transcripts, pdfs, &settings)?);

        Ok(Self {
            settings: Arc::new(settings),
            store,
            search,
            ingestor,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    pub fn search(&self) -> &SearchService {
        &self.search
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }
}
