//! Sources command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

/// Run the sources command.
pub async fn run_sources(settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;

    let videos = store.list_sources(&settings.vector_store.video_collection).await?;
    let documents = store
        .list_sources(&settings.vector_store.document_collection)
        .await?;

    if videos.is_empty() && documents.is_empty() {
        Output::info("Nothing indexed yet. Use 'amplon ingest defaults' to add content.");
        return Ok(());
    }

    if !videos.is_empty() {
        Output::header(&format!("Videos ({})", videos.len()));
        for source in &videos {
            Output::source_info(&source.source_id, source.chunk_count, "segments", &source.indexed_at);
        }
    }

    if !documents.is_empty() {
        Output::header(&format!("Documents ({})", documents.len()));
        for source in &documents {
            Output::source_info(&source.source_id, source.chunk_count, "pages", &source.indexed_at);
        }
    }

    let total_chunks = store.count(&settings.vector_store.video_collection).await?
        + store.count(&settings.vector_store.document_collection).await?;
    println!();
    Output::kv("Total sources", &(videos.len() + documents.len()).to_string());
    Output::kv("Total chunks", &total_chunks.to_string());

    Ok(())
}
