//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{format_timestamp, Output};
use crate::config::Settings;
use crate::context::AppContext;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, top_k: Option<usize>, pdf: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Search)?;

    let top_k = top_k.unwrap_or(settings.search.default_top_k);
    let ctx = AppContext::from_settings(settings)?;
    let search = ctx.search();

    let spinner = Output::spinner("Searching...");

    if pdf {
        let results = search.search_documents(query, top_k).await;
        spinner.finish_and_clear();
        let results = results?;

        if results.is_empty() {
            Output::warning("No PDF pages matched your query.");
            return Ok(());
        }

        Output::success(&format!("Found {} page(s)", results.len()));
        for result in &results {
            Output::search_result(
                &result.filename,
                &format!("page {}", result.page),
                None,
                &result.link,
            );
        }
    } else {
        let results = search.search_videos(query, top_k).await;
        spinner.finish_and_clear();
        let results = results?;

        if results.is_empty() {
            Output::warning("No transcript segments matched your query.");
            return Ok(());
        }

        Output::success(&format!("Found {} moment(s)", results.len()));
        for result in &results {
            Output::search_result(
                &result.video_id,
                &format_timestamp(result.start),
                Some(&result.text),
                &result.link,
            );
        }
    }

    Ok(())
}
