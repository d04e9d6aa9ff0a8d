//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{IngestTarget, Output};
use crate::config::Settings;
use crate::context::AppContext;
use crate::ingest::{IngestReport, SourceKind};
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(target: &IngestTarget, settings: Settings) -> Result<()> {
    match target {
        IngestTarget::Video { input } => {
            preflight::check(Operation::IngestVideo)?;
            let ctx = AppContext::from_settings(settings)?;
            let ingestor = ctx.ingestor();

            let spinner = Output::spinner(&format!("Indexing captions for {}...", input));
            let result = ingestor
                .with_retry(input, || ingestor.ingest_video(input))
                .await;
            spinner.finish_and_clear();

            report_single(result?);
        }

        IngestTarget::Pdf { input } => {
            preflight::check(Operation::IngestPdf)?;
            let ctx = AppContext::from_settings(settings)?;
            let ingestor = ctx.ingestor();

            let spinner = Output::spinner(&format!("Indexing {}...", input));
            let result = ingestor
                .with_retry(input, || ingestor.ingest_pdf(input))
                .await;
            spinner.finish_and_clear();

            report_single(result?);
        }

        IngestTarget::Defaults => run_defaults(settings).await?,
    }

    Ok(())
}

async fn run_defaults(settings: Settings) -> Result<()> {
    let video_ids = settings.ingest.video_ids.clone();
    let pdf_urls = settings.ingest.pdf_urls.clone();

    if video_ids.is_empty() && pdf_urls.is_empty() {
        Output::warning("No default sources configured under [ingest].");
        return Ok(());
    }

    if !video_ids.is_empty() {
        preflight::check(Operation::IngestVideo)?;
    } else {
        preflight::check(Operation::IngestPdf)?;
    }

    let ctx = AppContext::from_settings(settings)?;
    let total = video_ids.len() + pdf_urls.len();
    let pb = Output::progress_bar(total as u64, "Ingesting default sources");

    let outcomes = ctx
        .ingestor()
        .ingest_all(&video_ids, &pdf_urls, |outcome| {
            if let Err(e) = &outcome.result {
                pb.suspend(|| Output::error(&format!("{}: {}", outcome.source, e)));
            }
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    let mut failed = 0;
    for outcome in outcomes {
        match outcome.result {
            Ok(report) => report_single(report),
            Err(_) => failed += 1,
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} source(s) failed to ingest", failed, total);
    }

    Output::success(&format!("Ingested {} source(s)", total));
    Ok(())
}

fn report_single(report: IngestReport) {
    let unit = match report.kind {
        SourceKind::Video => "caption seconds",
        SourceKind::Document => "pages",
    };
    Output::success(&format!(
        "Indexed {} {} ({} {})",
        report.kind, report.source_id, report.chunks, unit
    ));
}
