//! HTTP API server.
//!
//! Binds the router from [`crate::server`] and optionally ingests the
//! configured default sources in the background.

use crate::cli::Output;
use crate::config::Settings;
use crate::context::AppContext;
use crate::server::create_router;
use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    ingest: bool,
    settings: Settings,
) -> Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    std::fs::create_dir_all(settings.upload_dir())
        .with_context(|| format!("Failed to create {}", settings.upload_dir().display()))?;

    let ctx = AppContext::from_settings(settings)?;
    let app = create_router(ctx.clone());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    Output::header("Amplon API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Search videos", "GET  /search?query=...&top_k=3");
    Output::kv("Search PDFs", "GET  /search-pdf?query=...&top_k=3");
    Output::kv("Ingest PDF", "POST /ingest-pdf (multipart field: file)");
    Output::kv("Ingest video", "POST /ingest-video");
    Output::kv("Sources", "GET  /sources");
    Output::kv("PDF files", "GET  /pdfs/{filename}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    if ingest {
        spawn_default_ingestion(ctx);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Ingest configured sources without blocking the listener. Failures are
/// logged; the server keeps serving whatever is already indexed.
fn spawn_default_ingestion(ctx: AppContext) {
    tokio::spawn(async move {
        let ingest = &ctx.settings().ingest;
        info!(
            "Background ingestion of {} video(s) and {} PDF(s)",
            ingest.video_ids.len(),
            ingest.pdf_urls.len()
        );

        ctx.ingestor()
            .ingest_all(&ingest.video_ids, &ingest.pdf_urls, |outcome| match &outcome.result {
                Ok(report) => info!(
                    "Indexed {} {} ({} chunks)",
                    report.kind, report.source_id, report.chunks
                ),
                Err(e) => error!("Failed to ingest {}: {}", outcome.source, e),
            })
            .await;
    });
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
    }
}
